use crate::forecast::error::ForecastError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// # Summary
/// 单次训练的评估指标，仅用于诊断，不作为门槛。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    // 平均绝对误差
    pub mae: f64,
    // 均方根误差
    pub rmse: f64,
    // 决定系数
    pub r2: f64,
}

/// # Summary
/// 一次数据更新周期的结果。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UpdateOutcome {
    /// 使用新下载的数据重建特征表并完成训练
    Retrained {
        rows: usize,
        train: EvaluationReport,
        test: EvaluationReport,
    },
    /// 未获得新数据，使用已有特征表重新训练
    ReusedExisting {
        rows: usize,
        train: EvaluationReport,
        test: EvaluationReport,
    },
}

/// # Summary
/// 预测服务契约，对 API 层暴露“更新”与“推理”两个用例。
///
/// # Invariants
/// - 更新周期之间互斥。
/// - 推理只读取已发布的成对产物 (模型 + 标准化器)。
#[async_trait]
pub trait ForecastService: Send + Sync {
    /// 本服务支持的代币代码，例如 `ETH`。
    fn token(&self) -> &str;

    /// # Summary
    /// 执行一次完整的数据更新与训练。
    ///
    /// # Logic
    /// 1. 下载两个资产的历史数据。
    /// 2. 归一化、构造特征、持久化特征表。
    /// 3. 训练并发布模型与标准化器。
    ///
    /// # Returns
    /// 成功返回更新结果，失败返回 ForecastError。
    async fn update(&self) -> Result<UpdateOutcome, ForecastError>;

    /// # Summary
    /// 对指定代币给出一次未来价格预测。
    ///
    /// # Arguments
    /// * `token`: 请求的代币代码 (大小写不敏感)。
    ///
    /// # Returns
    /// 成功返回已加偏差修正的预测价格。
    async fn predict(&self, token: &str) -> Result<f64, ForecastError>;
}
