//! # 更新路由控制器
//!
//! 实现 `/update`：同步执行一次数据更新与重新训练。

use axum::extract::State;

use crate::server::AppState;

/// 触发数据更新与模型重新训练
///
/// 成功返回 `0`，失败返回 `1`，两种情况的 HTTP 状态码均为 200。
/// 失败原因只写入日志。
#[utoipa::path(
    get,
    path = "/update",
    tag = "预测 (Forecast)",
    responses(
        (status = 200, description = "`0` 表示成功，`1` 表示失败", body = String, content_type = "text/plain")
    )
)]
pub async fn trigger_update(State(state): State<AppState>) -> &'static str {
    match state.forecaster.update().await {
        Ok(outcome) => {
            tracing::info!("Update succeeded: {:?}", outcome);
            "0"
        }
        Err(e) => {
            tracing::error!("Update failed: {}", e);
            "1"
        }
    }
}
