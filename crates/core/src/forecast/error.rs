use crate::feature::error::FeatureError;
use crate::market::error::MarketError;
use crate::model::error::ModelError;
use crate::store::error::StoreError;
use thiserror::Error;

/// # Summary
/// 预测服务层的统一错误类型，聚合各下层领域错误。
///
/// # Invariants
/// - 任意一次更新或推理请求中的错误都在请求边界被转换，不会导致进程退出。
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Market error: {0}")]
    Market(#[from] MarketError),
    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    // 没有可用的新数据，也没有可复用的旧特征表
    #[error("No data available: {0}")]
    NoData(String),
    // 请求的代币不是本服务预测的目标
    #[error("Token not supported: {0}")]
    UnsupportedToken(String),
    // 后台计算任务异常终止
    #[error("Task error: {0}")]
    Task(String),
}
