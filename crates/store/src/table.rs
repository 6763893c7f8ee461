use crate::artifact::publish_atomic;
use std::path::Path;
use tracing::info;
use yosoku_core::store::error::StoreError;
use yosoku_features::builder::{TARGET_COLUMN, feature_names};
use yosoku_features::table::FeatureTable;

/// # Summary
/// 原子写出训练特征表。
pub fn save_feature_table(path: &Path, table: &FeatureTable) -> Result<(), StoreError> {
    publish_atomic(path, |file| {
        table.write_csv(std::io::BufWriter::new(file))?;
        Ok(())
    })?;
    info!("Data saved to {} ({} rows)", path.display(), table.len());
    Ok(())
}

/// # Summary
/// 读取训练特征表。
///
/// # Logic
/// 1. 文件不存在返回 `StoreError::NotFound`。
/// 2. 逐列前向、后向填充后校验 80 个特征列与目标列是否齐全。
///
/// # Returns
/// 缺列时返回包含全部缺失列名的 `FeatureError::MissingColumns`。
pub fn load_feature_table(path: &Path) -> Result<FeatureTable, StoreError> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StoreError::NotFound(path.display().to_string()));
        }
        Err(e) => return Err(StoreError::Io(format!("{}: {}", path.display(), e))),
    };
    info!("Loading data from {}...", path.display());
    let table = FeatureTable::read_csv(std::io::BufReader::new(file), &feature_names(), TARGET_COLUMN)?;
    Ok(table)
}
