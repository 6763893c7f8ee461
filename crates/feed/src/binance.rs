use crate::http::HttpFetcher;
use crate::normalize;
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};
use yosoku_core::common::time::{Clock, SystemClock};
use yosoku_core::common::{Asset, DataProvider};
use yosoku_core::market::entity::AssetTable;
use yosoku_core::market::error::MarketError;
use yosoku_core::market::port::MarketDataProvider;

/// Binance 公共数据仓库的日 K 线归档地址
pub const ARCHIVE_BASE_URL: &str = "https://data.binance.vision/data/spot/daily/klines";

/// 实时窗口拉取的 1 分钟 K 线条数
pub const LIVE_WINDOW_LIMIT: u32 = 1000;

/// # Summary
/// Binance 行情提供者实现。
///
/// # Invariants
/// - 历史数据来自 data.binance.vision 的日归档 zip，实时数据来自 `api.binance.{region}`。
/// - 归档文件名形如 `{pair}-1m-{YYYY-MM-DD}.zip`，已存在的文件不重复下载。
#[derive(Clone)]
pub struct BinanceProvider {
    http: HttpFetcher,
    download_dir: PathBuf,
    archive_base_url: String,
    api_base_url: String,
    clock: Arc<dyn Clock>,
}

impl BinanceProvider {
    /// # Summary
    /// 创建 BinanceProvider。
    ///
    /// # Arguments
    /// * `http`: 共享的 HTTP 抓取器。
    /// * `download_dir`: 归档 zip 的落盘目录。
    /// * `region`: 实时接口域名后缀，如 `com` 或 `us`。
    pub fn new(http: HttpFetcher, download_dir: PathBuf, region: &str) -> Self {
        Self {
            http,
            download_dir,
            archive_base_url: ARCHIVE_BASE_URL.to_string(),
            api_base_url: format!("https://api.binance.{}", region),
            clock: Arc::new(SystemClock),
        }
    }

    /// 替换时钟，决定历史下载的日期窗口
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 替换归档与实时接口的根地址
    pub fn with_base_urls(mut self, archive_base_url: &str, api_base_url: &str) -> Self {
        self.archive_base_url = archive_base_url.trim_end_matches('/').to_string();
        self.api_base_url = api_base_url.trim_end_matches('/').to_string();
        self
    }

    /// # Summary
    /// 生成 `[today - days, today)` 区间内的每个日期。
    ///
    /// # Logic
    /// 1. 当天的归档尚未发布，不包含在区间内。
    pub fn archive_dates(&self, training_days: u32) -> Vec<NaiveDate> {
        let today = self.clock.today();
        let Some(start) = today.checked_sub_days(Days::new(training_days.into())) else {
            return Vec::new();
        };
        start.iter_days().take_while(|d| *d < today).collect()
    }

    fn archive_url(&self, pair: &str, date: NaiveDate) -> String {
        format!(
            "{}/{pair}/1m/{pair}-1m-{}.zip",
            self.archive_base_url,
            date.format("%Y-%m-%d")
        )
    }

    fn live_url(&self, pair: &str) -> String {
        format!(
            "{}/api/v3/klines?symbol={}&interval=1m&limit={}",
            self.api_base_url, pair, LIVE_WINDOW_LIMIT
        )
    }
}

#[async_trait]
impl MarketDataProvider for BinanceProvider {
    fn provider(&self) -> DataProvider {
        DataProvider::Binance
    }

    /// # Summary
    /// 并发下载训练窗口内的全部日归档。
    ///
    /// # Logic
    /// 1. 每个日期一个任务，任务各自返回下载结果。
    /// 2. 通过 JoinSet 统一收集成功的路径，404 与失败的日期被忽略。
    /// 3. 返回前按路径排序，保证解析顺序稳定。
    async fn download_history(
        &self,
        asset: Asset,
        training_days: u32,
    ) -> Result<Vec<PathBuf>, MarketError> {
        let pair = asset.pair();
        let dates = self.archive_dates(training_days);
        if let (Some(first), Some(last)) = (dates.first(), dates.last()) {
            info!("Downloading data for {} from {} to {}", pair, first, last);
        }

        let mut tasks = JoinSet::new();
        for date in dates {
            let url = self.archive_url(pair, date);
            let dest = self
                .download_dir
                .join(format!("{}-1m-{}.zip", pair, date.format("%Y-%m-%d")));
            let http = self.http.clone();
            tasks.spawn(async move { http.download_file(&url, &dest, true).await });
        }

        let mut files = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(path)) => files.push(path),
                Ok(None) => {}
                Err(e) => warn!("Download task for {} aborted: {}", pair, e),
            }
        }
        files.sort();
        info!("{} archive files available for {}", files.len(), pair);
        Ok(files)
    }

    fn load_history(&self, asset: Asset, files: &[PathBuf]) -> AssetTable {
        normalize::normalize_archives(asset, files)
    }

    async fn fetch_live(&self, asset: Asset) -> Result<AssetTable, MarketError> {
        let url = self.live_url(asset.pair());
        info!("Fetching current day data from {}", url);
        let body = self.http.get_bytes(&url).await?;
        let candles = normalize::parse_binance_klines(&body)?;
        Ok(AssetTable::new(asset, candles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RetryPolicy;
    use chrono::{TimeZone, Utc};
    use yosoku_core::common::time::FixedClock;

    fn provider() -> BinanceProvider {
        let clock = FixedClock(Utc.with_ymd_and_hms(2026, 3, 3, 12, 0, 0).unwrap());
        BinanceProvider::new(
            HttpFetcher::new(RetryPolicy::default()).unwrap(),
            PathBuf::from("data/binance"),
            "us",
        )
        .with_clock(Arc::new(clock))
    }

    #[test]
    fn test_archive_dates_exclude_today() {
        let dates = provider().archive_dates(3);
        let expected: Vec<NaiveDate> = [(2026, 2, 28), (2026, 3, 1), (2026, 3, 2)]
            .iter()
            .map(|(y, m, d)| NaiveDate::from_ymd_opt(*y, *m, *d).unwrap())
            .collect();
        assert_eq!(dates, expected);
        assert!(provider().archive_dates(0).is_empty());
    }

    #[test]
    fn test_urls() {
        let p = provider();
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(
            p.archive_url("ETHUSDT", date),
            "https://data.binance.vision/data/spot/daily/klines/ETHUSDT/1m/ETHUSDT-1m-2026-03-02.zip"
        );
        assert_eq!(
            p.live_url("BTCUSDT"),
            "https://api.binance.us/api/v3/klines?symbol=BTCUSDT&interval=1m&limit=1000"
        );
    }
}
