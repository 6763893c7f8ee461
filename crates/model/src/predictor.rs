use crate::regression::LinearRegression;
use tracing::{debug, info};
use yosoku_core::feature::error::FeatureError;
use yosoku_core::market::entity::AssetTable;
use yosoku_core::model::error::ModelError;
use yosoku_features::builder::{BuildMode, MIN_ALIGNED_ROWS, build_features};
use yosoku_features::dataset::StandardScaler;
use yosoku_features::frame::AlignedFrame;
use yosoku_store::artifact::ArtifactStore;

/// # Summary
/// 已加载的成对模型与标准化器。
///
/// # Invariants
/// - `model` 与 `scaler` 来自同一次训练。
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub run_id: String,
    model: LinearRegression,
    scaler: StandardScaler,
    bias_correction: f64,
}

impl LoadedModel {
    pub fn new(
        run_id: String,
        model: LinearRegression,
        scaler: StandardScaler,
        bias_correction: f64,
    ) -> Self {
        Self {
            run_id,
            model,
            scaler,
            bias_correction,
        }
    }

    /// # Summary
    /// 对实时窗口给出一次预测。
    ///
    /// # Logic
    /// 1. 外连接两个资产表，两个资产字段齐全的行少于 11 时返回数据不足。
    /// 2. 以推理模式构造特征，校验列顺序与标准化器一致。
    /// 3. 只对最后一行标准化并预测，加上偏差修正。
    ///
    /// # Arguments
    /// * `eth`: ETH 实时窗口。
    /// * `btc`: BTC 实时窗口。
    ///
    /// # Returns
    /// 修正后的预测价格。
    pub fn predict(&self, eth: &AssetTable, btc: &AssetTable) -> Result<f64, ModelError> {
        let frame = AlignedFrame::align(eth, btc);
        let complete = (0..frame.len()).filter(|&row| frame.complete_at(row)).count();
        if complete < MIN_ALIGNED_ROWS {
            return Err(FeatureError::InsufficientData {
                required: MIN_ALIGNED_ROWS,
                available: complete,
            }
            .into());
        }

        let features = build_features(&frame, BuildMode::Inference)?;
        self.scaler.check_columns(features.columns())?;
        let last = features.last_row().ok_or(FeatureError::InsufficientData {
            required: MIN_ALIGNED_ROWS,
            available: complete,
        })?;
        debug!("Inference input data shape: ({}, {})", features.len(), last.len());

        let scaled = self.scaler.transform_row(last)?;
        let raw = self.model.predict_row(&scaled)?;
        Ok(raw + self.bias_correction)
    }
}

/// # Summary
/// 预测器：从存储加载成对产物。
#[derive(Debug, Clone)]
pub struct Predictor {
    store: ArtifactStore,
    bias_correction: f64,
}

impl Predictor {
    pub fn new(store: ArtifactStore, bias_correction: f64) -> Self {
        Self {
            store,
            bias_correction,
        }
    }

    /// # Summary
    /// 加载当前发布的模型与标准化器。
    ///
    /// # Returns
    /// 产物缺失返回 NotFound，run_id 不一致返回 PairMismatch (均包装为 ModelError::Store)。
    pub fn load(&self) -> Result<LoadedModel, ModelError> {
        let (model, scaler) = self
            .store
            .load_pair::<LinearRegression, StandardScaler>()?;
        if model.payload.width() != scaler.payload.width() {
            return Err(ModelError::DimensionMismatch {
                expected: scaler.payload.width(),
                got: model.payload.width(),
            });
        }
        info!("Loaded model run {}", model.run_id);
        Ok(LoadedModel::new(
            model.run_id,
            model.payload,
            scaler.payload,
            self.bias_correction,
        ))
    }
}
