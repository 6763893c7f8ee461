use crate::metrics::evaluate;
use crate::regression::LinearRegression;
use tracing::info;
use uuid::Uuid;
use yosoku_core::forecast::port::EvaluationReport;
use yosoku_core::model::error::ModelError;
use yosoku_features::dataset::split_and_scale;
use yosoku_features::table::FeatureTable;
use yosoku_store::artifact::ArtifactStore;

/// 一次训练的摘要
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRun {
    pub run_id: String,
    pub rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub train: EvaluationReport,
    pub test: EvaluationReport,
}

/// # Summary
/// 训练器：切分、标准化、拟合、评估并发布成对产物。
///
/// # Invariants
/// - 评估指标只用于日志诊断，不会阻止产物发布。
#[derive(Debug, Clone)]
pub struct Trainer {
    store: ArtifactStore,
    train_ratio: f64,
}

impl Trainer {
    pub fn new(store: ArtifactStore, train_ratio: f64) -> Self {
        Self { store, train_ratio }
    }

    /// # Summary
    /// 在特征表上训练模型。
    ///
    /// # Logic
    /// 1. 按时间顺序切分，只在训练部分拟合标准化器。
    /// 2. 在标准化后的训练集上拟合 OLS。
    /// 3. 记录训练集与测试集的 MAE / RMSE / R²。
    /// 4. 生成新的 run_id，发布模型与标准化器。
    ///
    /// # Arguments
    /// * `table`: 带目标列的特征表。
    ///
    /// # Returns
    /// 成功返回训练摘要。
    pub fn train(&self, table: &FeatureTable) -> Result<TrainingRun, ModelError> {
        let split = split_and_scale(table, self.train_ratio)?;
        let width = split.scaler.width();
        info!(
            "Training data shape: ({}, {}), Test data shape: ({}, {})",
            split.train_x.len(),
            width,
            split.test_x.len(),
            width
        );

        let model = LinearRegression::fit(&split.train_x, &split.train_y)?;
        info!("Trained LinearRegression model");

        let train = evaluate(&split.train_y, &model.predict(&split.train_x)?)?;
        info!("Training MAE: {:.6}", train.mae);
        info!("Training RMSE: {:.6}", train.rmse);
        info!("Training R²: {:.6}", train.r2);

        let test = evaluate(&split.test_y, &model.predict(&split.test_x)?)?;
        info!("Test MAE: {:.6}", test.mae);
        info!("Test RMSE: {:.6}", test.rmse);
        info!("Test R²: {:.6}", test.r2);

        let run_id = Uuid::new_v4().to_string();
        self.store.save_pair(&run_id, &model, &split.scaler)?;

        Ok(TrainingRun {
            run_id,
            rows: table.len(),
            train_rows: split.train_x.len(),
            test_rows: split.test_x.len(),
            train,
            test,
        })
    }
}
