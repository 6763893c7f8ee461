use thiserror::Error;

/// # Summary
/// 模型域错误枚举，处理训练求解与推理输入问题。
#[derive(Error, Debug)]
pub enum ModelError {
    // 训练集为空
    #[error("Training set is empty")]
    EmptyTrainingSet,
    // 推理输入没有任何可用行
    #[error("No rows available for prediction")]
    EmptyInput,
    // 特征维度与模型不一致
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    // 最小二乘求解失败
    #[error("Solver error: {0}")]
    Solver(String),
    // 上游特征处理失败
    #[error("Feature error: {0}")]
    Feature(#[from] crate::feature::error::FeatureError),
    // 模型或标准化器读写失败
    #[error("Store error: {0}")]
    Store(#[from] crate::store::error::StoreError),
}
