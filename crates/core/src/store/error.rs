use crate::feature::error::FeatureError;
use thiserror::Error;

/// # Summary
/// 存储层错误枚举，处理数据目录、产物文件读写失败等问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 文件系统操作失败
    #[error("IO error: {0}")]
    Io(String),
    /// 产物文件不存在
    #[error("Artifact not found: {0}")]
    NotFound(String),
    /// 产物序列化失败
    #[error("Serialize error: {0}")]
    Serialize(String),
    /// 产物反序列化失败
    #[error("Deserialize error: {0}")]
    Deserialize(String),
    /// 模型与标准化器不是同一次训练产出的
    #[error("Artifact pair mismatch: model run {model_run} vs scaler run {scaler_run}")]
    PairMismatch {
        model_run: String,
        scaler_run: String,
    },
    /// 特征表内容不合法
    #[error(transparent)]
    Feature(#[from] FeatureError),
}
