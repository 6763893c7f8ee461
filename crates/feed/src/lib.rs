//! # `yosoku-feed` - 行情数据源
//!
//! 负责从 Binance 与 CoinGecko 下载历史原始文件、拉取实时窗口，并归一化为 [`AssetTable`](yosoku_core::market::entity::AssetTable)。

pub mod binance;
pub mod coingecko;
pub mod http;
pub mod normalize;

use std::path::PathBuf;
use std::sync::Arc;
use yosoku_core::common::DataProvider;
use yosoku_core::config::ForecastConfig;
use yosoku_core::market::error::MarketError;
use yosoku_core::market::port::MarketDataProvider;

/// # Summary
/// 根据配置构建对应的数据源实现。
///
/// # Arguments
/// * `config`: 预测配置，决定数据源、区域与 API Key。
/// * `download_dir`: 该数据源原始文件的落盘目录。
///
/// # Returns
/// 成功返回数据源实例。
pub fn build_provider(
    config: &ForecastConfig,
    download_dir: PathBuf,
) -> Result<Arc<dyn MarketDataProvider>, MarketError> {
    let fetcher = http::HttpFetcher::new(http::RetryPolicy::default())?;
    let provider: Arc<dyn MarketDataProvider> = match config.provider {
        DataProvider::Binance => Arc::new(binance::BinanceProvider::new(
            fetcher,
            download_dir,
            &config.region,
        )),
        DataProvider::CoinGecko => Arc::new(coingecko::CoinGeckoProvider::new(
            fetcher,
            download_dir,
            config.cg_api_key.clone().unwrap_or_default(),
        )),
    };
    Ok(provider)
}
