use crate::common::{Asset, DataProvider};
use crate::market::entity::AssetTable;
use crate::market::error::MarketError;
use async_trait::async_trait;
use std::path::PathBuf;

/// # Summary
/// 市场行情数据提供者接口（原始数据源）。
///
/// # Invariants
/// - 历史下载只负责落盘，解析由 `load_history` 完成，二者使用同一数据源的格式约定。
/// - 单个文件的下载或解析失败不得中断整批处理。
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// 数据源标识，用于日志与解析分支选择。
    fn provider(&self) -> DataProvider;

    /// # Summary
    /// 下载训练所需的历史原始文件。
    ///
    /// # Logic
    /// 1. 根据训练天数生成远端文件列表。
    /// 2. 每个远端文件一个并发任务，各自返回结果后统一收集。
    /// 3. 本地已存在的文件直接复用。
    ///
    /// # Arguments
    /// * `asset`: 目标资产。
    /// * `training_days`: 回溯天数。
    ///
    /// # Returns
    /// 成功落盘（或已存在）的文件路径列表，可能为空。
    async fn download_history(
        &self,
        asset: Asset,
        training_days: u32,
    ) -> Result<Vec<PathBuf>, MarketError>;

    /// # Summary
    /// 将历史原始文件解析为统一的资产表。
    ///
    /// # Logic
    /// 1. 过滤出属于该资产且扩展名匹配的文件并排序。
    /// 2. 逐个解析，失败的文件记录日志后跳过。
    /// 3. 拼接、排序、去重 (keep-last)。
    ///
    /// # Returns
    /// 资产表；所有文件都无法解析时返回空表。
    fn load_history(&self, asset: Asset, files: &[PathBuf]) -> AssetTable;

    /// # Summary
    /// 拉取最近一段实时 K 线窗口，用于单次推理。
    ///
    /// # Arguments
    /// * `asset`: 目标资产。
    ///
    /// # Returns
    /// 成功返回归一化后的资产表。
    async fn fetch_live(&self, asset: Asset) -> Result<AssetTable, MarketError>;
}
