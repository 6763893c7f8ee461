use crate::http::HttpFetcher;
use crate::normalize;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, warn};
use yosoku_core::common::{Asset, DataProvider};
use yosoku_core::market::entity::AssetTable;
use yosoku_core::market::error::MarketError;
use yosoku_core::market::port::MarketDataProvider;

/// CoinGecko v3 公共接口地址
pub const API_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// # Summary
/// 将代币符号映射为 CoinGecko 的 coin id。
///
/// # Returns
/// 不支持的代币返回 `MarketError::UnsupportedToken`。
pub fn coin_id(token: &str) -> Result<&'static str, MarketError> {
    match token.to_uppercase().as_str() {
        "ETH" => Ok("ethereum"),
        "SOL" => Ok("solana"),
        "BTC" => Ok("bitcoin"),
        "BNB" => Ok("binancecoin"),
        "ARB" => Ok("arbitrum"),
        _ => Err(MarketError::UnsupportedToken(token.to_string())),
    }
}

/// # Summary
/// 将训练天数向上归入 CoinGecko OHLC 接口支持的档位。
///
/// # Logic
/// 1. 依次匹配 7 / 14 / 30 / 90 / 180 / 365 天档位。
/// 2. 超过 365 天使用 `max`。
pub fn history_days(training_days: u32) -> String {
    const BUCKETS: [u32; 6] = [7, 14, 30, 90, 180, 365];
    BUCKETS
        .iter()
        .find(|bucket| training_days <= **bucket)
        .map(|bucket| bucket.to_string())
        .unwrap_or_else(|| "max".to_string())
}

/// # Summary
/// CoinGecko 行情提供者实现。
///
/// # Invariants
/// - 每个资产一个历史文件 `{coin_id}_ohlc_{days}.json`，每次下载都会覆盖。
/// - 返回的 OHLC 不含成交量。
#[derive(Clone)]
pub struct CoinGeckoProvider {
    http: HttpFetcher,
    download_dir: PathBuf,
    api_key: String,
    base_url: String,
}

impl CoinGeckoProvider {
    pub fn new(http: HttpFetcher, download_dir: PathBuf, api_key: String) -> Self {
        Self {
            http,
            download_dir,
            api_key,
            base_url: API_BASE_URL.to_string(),
        }
    }

    /// 替换接口根地址
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn ohlc_url(&self, coin_id: &str, days: &str) -> String {
        format!(
            "{}/coins/{}/ohlc?vs_currency=usd&days={}&api_key={}",
            self.base_url, coin_id, days, self.api_key
        )
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoProvider {
    fn provider(&self) -> DataProvider {
        DataProvider::CoinGecko
    }

    async fn download_history(
        &self,
        asset: Asset,
        training_days: u32,
    ) -> Result<Vec<PathBuf>, MarketError> {
        let id = coin_id(asset.symbol())?;
        let days = history_days(training_days);
        info!("Downloading data for {} (days={})", id, days);

        let dest = self.download_dir.join(format!("{}_ohlc_{}.json", id, days));
        let url = self.ohlc_url(id, &days);
        match self.http.download_file(&url, &dest, false).await {
            Some(path) => Ok(vec![path]),
            None => {
                warn!("No history downloaded for {}", id);
                Ok(Vec::new())
            }
        }
    }

    fn load_history(&self, asset: Asset, files: &[PathBuf]) -> AssetTable {
        normalize::normalize_coingecko_files(asset, files)
    }

    async fn fetch_live(&self, asset: Asset) -> Result<AssetTable, MarketError> {
        let id = coin_id(asset.symbol())?;
        info!("Fetching current day data for {}", id);
        let body = self.http.get_bytes(&self.ohlc_url(id, "1")).await?;
        let candles = normalize::parse_coingecko_ohlc(&body)?;
        Ok(AssetTable::new(asset, candles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_days_buckets() {
        assert_eq!(history_days(1), "7");
        assert_eq!(history_days(7), "7");
        assert_eq!(history_days(8), "14");
        assert_eq!(history_days(30), "30");
        assert_eq!(history_days(31), "90");
        assert_eq!(history_days(365), "365");
        assert_eq!(history_days(366), "max");
    }

    #[test]
    fn test_coin_id_mapping() {
        assert_eq!(coin_id("eth").unwrap(), "ethereum");
        assert_eq!(coin_id("BTC").unwrap(), "bitcoin");
        assert!(matches!(
            coin_id("DOGE"),
            Err(MarketError::UnsupportedToken(t)) if t == "DOGE"
        ));
    }
}
