use thiserror::Error;

/// # Summary
/// 特征工程域错误枚举，覆盖特征表读写、列缺失与样本不足。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum FeatureError {
    // 已加载的数据缺少必需的特征列 (例如旧版本的特征表)
    #[error("Missing features in data: {0:?}")]
    MissingColumns(Vec<String>),
    // 对齐后的有效行数不足以产出任何特征行
    #[error("Insufficient data: need at least {required} aligned rows, got {available}")]
    InsufficientData { required: usize, available: usize },
    // 特征列数量与标准化器不一致
    #[error("Feature count mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    // 特征表 CSV 解析或写出失败
    #[error("Table format error: {0}")]
    Format(String),
    // 文件读写失败
    #[error("IO error: {0}")]
    Io(String),
}
