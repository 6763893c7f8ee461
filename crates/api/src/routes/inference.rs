//! # 推理路由控制器
//!
//! 实现 `/inference/{token}`：校验代币后返回一次纯文本价格预测。

use axum::extract::{Path, State};

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::ApiErrorResponse;

/// 获取目标代币 6 小时后的价格预测
///
/// 代币代码大小写不敏感，只接受服务配置的目标代币。
/// 成功时响应体为纯文本十进制数字。
#[utoipa::path(
    get,
    path = "/inference/{token}",
    tag = "预测 (Forecast)",
    params(
        ("token" = String, Path, description = "代币代码，例如 ETH")
    ),
    responses(
        (status = 200, description = "预测价格", body = String, content_type = "text/plain"),
        (status = 400, description = "代币不受支持", body = ApiErrorResponse),
        (status = 500, description = "预测流水线失败", body = ApiErrorResponse)
    )
)]
pub async fn get_inference(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<String, ApiError> {
    if token.trim().is_empty() {
        return Err(ApiError::BadRequest("Token is required".to_string()));
    }
    let price = state.forecaster.predict(&token).await?;
    tracing::info!("Inference for {}: {}", token, price);
    Ok(price.to_string())
}
