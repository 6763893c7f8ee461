use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::spawn_blocking;
use tracing::{info, warn};
use yosoku_core::common::Asset;
use yosoku_core::config::ForecastConfig;
use yosoku_core::forecast::error::ForecastError;
use yosoku_core::forecast::port::{ForecastService, UpdateOutcome};
use yosoku_core::market::port::MarketDataProvider;
use yosoku_core::store::error::StoreError;
use yosoku_features::builder::{BuildMode, build_features};
use yosoku_features::frame::AlignedFrame;
use yosoku_model::predictor::Predictor;
use yosoku_model::trainer::Trainer;
use yosoku_store::artifact::ArtifactStore;
use yosoku_store::layout::DataLayout;
use yosoku_store::table::{load_feature_table, save_feature_table};

fn join_error(e: tokio::task::JoinError) -> ForecastError {
    ForecastError::Task(e.to_string())
}

/// # Summary
/// 预测服务的默认实现，系统的应用服务层门面 (Facade)。
/// 编译期仅依赖 `yosoku-core` 中的 Trait 定义，数据源通过构造函数注入。
///
/// # Invariants
/// - 更新周期由 `update_lock` 串行化。
/// - 特征构造、训练与推理在阻塞线程池上执行，不占用异步工作线程。
pub struct Forecaster {
    // 行情数据源
    provider: Arc<dyn MarketDataProvider>,
    // 数据目录布局
    layout: DataLayout,
    // 预测配置
    config: ForecastConfig,
    // 更新周期互斥锁
    update_lock: Mutex<()>,
}

impl Forecaster {
    /// # Summary
    /// 创建 Forecaster 实例。
    ///
    /// # Arguments
    /// * `provider`: 行情数据源。
    /// * `layout`: 数据目录布局。
    /// * `config`: 预测配置。
    ///
    /// # Returns
    /// 可共享的服务实例。
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        layout: DataLayout,
        config: ForecastConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            provider,
            layout,
            config,
            update_lock: Mutex::new(()),
        })
    }

    /// # Summary
    /// 由新下载的原始文件重建并保存特征表。
    ///
    /// # Logic
    /// 1. 任一资产没有文件或解析后为空表时，视为没有新数据。
    /// 2. 对齐、构造训练特征；结果为空同样视为没有新数据，不覆盖已有特征表。
    /// 3. 原子写出特征表。
    ///
    /// # Returns
    /// 写出新表时返回其行数，没有新数据时返回 None。
    fn rebuild_table(
        provider: &dyn MarketDataProvider,
        layout: &DataLayout,
        eth_files: &[PathBuf],
        btc_files: &[PathBuf],
    ) -> Result<Option<usize>, ForecastError> {
        info!(
            "Files for BTCUSDT: {}, Files for ETHUSDT: {}",
            btc_files.len(),
            eth_files.len()
        );
        if eth_files.is_empty() || btc_files.is_empty() {
            warn!("No files provided for BTCUSDT or ETHUSDT");
            return Ok(None);
        }

        let eth = provider.load_history(Asset::Eth, eth_files);
        let btc = provider.load_history(Asset::Btc, btc_files);
        if eth.is_empty() || btc.is_empty() {
            warn!("No data processed for BTCUSDT or ETHUSDT");
            return Ok(None);
        }
        if let (Some((eth_start, eth_end)), Some((btc_start, btc_end))) = (eth.span(), btc.span()) {
            info!(
                "ETHUSDT {} rows [{} .. {}], BTCUSDT {} rows [{} .. {}]",
                eth.len(),
                eth_start,
                eth_end,
                btc.len(),
                btc_start,
                btc_end
            );
        }

        let frame = AlignedFrame::align(&eth, &btc);
        let table = build_features(&frame, BuildMode::Training)?;
        info!("Total rows in price data after preprocessing: {}", table.len());
        if table.is_empty() {
            warn!("Feature build produced no rows, keeping the existing table");
            return Ok(None);
        }

        save_feature_table(&layout.price_data_path(), &table)?;
        Ok(Some(table.len()))
    }
}

#[async_trait]
impl ForecastService for Forecaster {
    fn token(&self) -> &str {
        &self.config.token
    }

    /// # Summary
    /// 执行一次完整的数据更新与训练。
    ///
    /// # Logic
    /// 1. 获取更新锁。
    /// 2. 并发下载 ETH 与 BTC 的历史文件。
    /// 3. 在阻塞线程池中重建特征表；没有新数据时沿用已有特征表。
    /// 4. 从磁盘加载特征表并训练，发布成对产物。
    async fn update(&self) -> Result<UpdateOutcome, ForecastError> {
        let _guard = self.update_lock.lock().await;
        let days = self.config.training_days;
        info!(
            "Downloading data for {} with training_days={}, region={}, provider={}",
            self.config.token,
            days,
            self.config.region,
            self.provider.provider()
        );

        let (eth_files, btc_files) = tokio::try_join!(
            self.provider.download_history(Asset::Eth, days),
            self.provider.download_history(Asset::Btc, days),
        )?;

        let provider = self.provider.clone();
        let layout = self.layout.clone();
        let rebuilt = spawn_blocking(move || {
            Self::rebuild_table(provider.as_ref(), &layout, &eth_files, &btc_files)
        })
        .await
        .map_err(join_error)??;
        if rebuilt.is_none() {
            info!("No new data, reusing the existing feature table");
        }

        let layout = self.layout.clone();
        let ratio = self.config.train_ratio;
        let run = spawn_blocking(move || {
            let table = match load_feature_table(&layout.price_data_path()) {
                Ok(table) => table,
                Err(StoreError::NotFound(path)) => {
                    return Err(ForecastError::NoData(format!(
                        "no new market data and no feature table at {}",
                        path
                    )));
                }
                Err(e) => return Err(e.into()),
            };
            Ok(Trainer::new(ArtifactStore::new(layout), ratio).train(&table)?)
        })
        .await
        .map_err(join_error)??;

        info!(
            "Update finished: {} rows, run {} ({} timeframe)",
            run.rows, run.run_id, self.config.timeframe
        );
        Ok(match rebuilt {
            Some(_) => UpdateOutcome::Retrained {
                rows: run.rows,
                train: run.train,
                test: run.test,
            },
            None => UpdateOutcome::ReusedExisting {
                rows: run.rows,
                train: run.train,
                test: run.test,
            },
        })
    }

    /// # Summary
    /// 对指定代币给出一次未来价格预测。
    ///
    /// # Logic
    /// 1. 校验代币与配置一致 (大小写不敏感)。
    /// 2. 先加载成对产物，缺失时直接失败，不发起网络请求。
    /// 3. 并发拉取 ETH 与 BTC 的实时窗口。
    /// 4. 在阻塞线程池中构造特征并预测最后一行。
    async fn predict(&self, token: &str) -> Result<f64, ForecastError> {
        if !token.eq_ignore_ascii_case(&self.config.token) {
            return Err(ForecastError::UnsupportedToken(token.to_string()));
        }

        let predictor = Predictor::new(
            ArtifactStore::new(self.layout.clone()),
            self.config.bias_correction,
        );
        let loaded = spawn_blocking(move || predictor.load())
            .await
            .map_err(join_error)??;

        let (eth, btc) = tokio::try_join!(
            self.provider.fetch_live(Asset::Eth),
            self.provider.fetch_live(Asset::Btc),
        )?;
        info!("Live window: ETH {} rows, BTC {} rows", eth.len(), btc.len());

        let price = spawn_blocking(move || loaded.predict(&eth, &btc))
            .await
            .map_err(join_error)??;
        info!(
            "Predicted {} {} price: {:.2}",
            self.config.timeframe, self.config.token, price
        );
        Ok(price)
    }
}
