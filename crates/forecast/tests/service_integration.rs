use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use yosoku_core::common::{Asset, DataProvider};
use yosoku_core::config::AppConfig;
use yosoku_core::forecast::error::ForecastError;
use yosoku_core::forecast::port::{ForecastService, UpdateOutcome};
use yosoku_core::market::entity::{AssetTable, Candle};
use yosoku_core::market::error::MarketError;
use yosoku_core::market::port::MarketDataProvider;
use yosoku_core::model::error::ModelError;
use yosoku_core::store::error::StoreError;
use yosoku_forecast::service::Forecaster;
use yosoku_store::layout::DataLayout;

fn synthetic(asset: Asset, rows: usize, offset: usize) -> AssetTable {
    let base = match asset {
        Asset::Eth => 2400.0,
        Asset::Btc => 88000.0,
    };
    let t0 = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
    let candles = (offset..offset + rows).map(|i| {
        let x = i as f64;
        let close = base + (x * 0.07).sin() * 9.0 + x * 0.03;
        Candle {
            time: t0 + Duration::minutes(i as i64),
            open: close - 0.2,
            high: close + 0.6,
            low: close - 0.7,
            close,
            volume: 3.0 + (x * 0.3).cos().abs(),
            quote_volume: None,
            trade_count: None,
            taker_volume: None,
        }
    });
    AssetTable::new(asset, candles)
}

/// 模拟数据源：历史与实时数据均由内存生成
struct MockProvider {
    history_rows: usize,
    live_rows: usize,
    has_history: AtomicBool,
    live_calls: AtomicUsize,
}

impl MockProvider {
    fn new(history_rows: usize, live_rows: usize) -> Self {
        Self {
            history_rows,
            live_rows,
            has_history: AtomicBool::new(true),
            live_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    fn provider(&self) -> DataProvider {
        DataProvider::Binance
    }

    async fn download_history(
        &self,
        asset: Asset,
        _training_days: u32,
    ) -> Result<Vec<PathBuf>, MarketError> {
        if self.has_history.load(Ordering::SeqCst) {
            Ok(vec![PathBuf::from(format!("{}-mock.zip", asset.pair()))])
        } else {
            Ok(Vec::new())
        }
    }

    fn load_history(&self, asset: Asset, _files: &[PathBuf]) -> AssetTable {
        synthetic(asset, self.history_rows, 0)
    }

    async fn fetch_live(&self, asset: Asset) -> Result<AssetTable, MarketError> {
        self.live_calls.fetch_add(1, Ordering::SeqCst);
        Ok(synthetic(asset, self.live_rows, self.history_rows))
    }
}

fn service(provider: Arc<MockProvider>, dir: &std::path::Path) -> Arc<Forecaster> {
    let config = AppConfig::default().forecast;
    Forecaster::new(provider, DataLayout::new(dir), config)
}

/// # Summary
/// 更新周期：下载、构造特征、训练后即可推理。
#[tokio::test]
async fn test_update_then_predict() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let provider = Arc::new(MockProvider::new(600, 40));
    let forecaster = service(provider.clone(), tmp.path());

    let outcome = forecaster.update().await?;
    match outcome {
        UpdateOutcome::Retrained { rows, .. } => assert_eq!(rows, 230),
        other => anyhow::bail!("unexpected outcome: {:?}", other),
    }
    let layout = DataLayout::new(tmp.path());
    assert!(layout.price_data_path().exists());
    assert!(layout.model_path().exists());
    assert!(layout.scaler_path().exists());

    let price = forecaster.predict("eth").await?;
    assert!(price.is_finite());
    assert_eq!(forecaster.token(), "ETH");
    assert_eq!(provider.live_calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_update_reuses_existing_table_without_new_data() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let provider = Arc::new(MockProvider::new(500, 40));
    let forecaster = service(provider.clone(), tmp.path());
    forecaster.update().await?;

    provider.has_history.store(false, Ordering::SeqCst);
    let outcome = forecaster.update().await?;
    assert!(matches!(outcome, UpdateOutcome::ReusedExisting { rows: 130, .. }));
    Ok(())
}

#[tokio::test]
async fn test_update_without_any_data_fails() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let provider = Arc::new(MockProvider::new(500, 40));
    provider.has_history.store(false, Ordering::SeqCst);
    let forecaster = service(provider, tmp.path());

    let result = forecaster.update().await;
    assert!(matches!(result, Err(ForecastError::NoData(_))));
    Ok(())
}

#[tokio::test]
async fn test_predict_rejects_other_tokens_and_missing_model() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let provider = Arc::new(MockProvider::new(500, 40));
    let forecaster = service(provider.clone(), tmp.path());

    let result = forecaster.predict("BTC").await;
    assert!(matches!(result, Err(ForecastError::UnsupportedToken(t)) if t == "BTC"));

    let result = forecaster.predict("ETH").await;
    assert!(matches!(
        result,
        Err(ForecastError::Model(ModelError::Store(StoreError::NotFound(_))))
    ));
    // 产物缺失时不会发起实时请求
    assert_eq!(provider.live_calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_updates_are_serialized() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let provider = Arc::new(MockProvider::new(450, 40));
    let forecaster = service(provider, tmp.path());

    let (a, b) = tokio::join!(forecaster.update(), forecaster.update());
    assert!(a.is_ok() && b.is_ok());
    assert!(forecaster.predict("ETH").await?.is_finite());
    Ok(())
}
