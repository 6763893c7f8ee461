use std::path::{Path, PathBuf};
use yosoku_core::common::DataProvider;
use yosoku_core::store::error::StoreError;

/// 特征表文件名
pub const PRICE_DATA_FILE: &str = "price_data.csv";
/// 模型产物文件名
pub const MODEL_FILE: &str = "model.bin";
/// 标准化器产物文件名
pub const SCALER_FILE: &str = "scaler.bin";
/// 日志目录名
pub const LOGS_DIR: &str = "logs";

/// # Summary
/// 数据目录布局。
///
/// # Invariants
/// - 所有路径都位于 `root` 之下：
///   `binance/`、`coingecko/` 原始文件，`price_data.csv`、`model.bin`、`scaler.bin`、`logs/`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 某数据源的原始文件目录
    pub fn raw_dir(&self, provider: DataProvider) -> PathBuf {
        self.root.join(provider.to_string())
    }

    pub fn price_data_path(&self) -> PathBuf {
        self.root.join(PRICE_DATA_FILE)
    }

    pub fn model_path(&self) -> PathBuf {
        self.root.join(MODEL_FILE)
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.root.join(SCALER_FILE)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join(LOGS_DIR)
    }

    /// # Summary
    /// 创建根目录、日志目录及各数据源的原始文件目录。
    pub fn ensure_dirs(&self) -> Result<(), StoreError> {
        for dir in [
            self.root.clone(),
            self.logs_dir(),
            self.raw_dir(DataProvider::Binance),
            self.raw_dir(DataProvider::CoinGecko),
        ] {
            std::fs::create_dir_all(&dir)
                .map_err(|e| StoreError::Io(format!("{}: {}", dir.display(), e)))?;
        }
        Ok(())
    }
}
