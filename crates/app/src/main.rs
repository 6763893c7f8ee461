use tracing::{error, info};
use yosoku_api::server::{AppState, start_server};
use yosoku_core::forecast::port::ForecastService;
use yosoku_forecast::service::Forecaster;
use yosoku_store::layout::DataLayout;

mod logging;
mod settings;

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并通过 Arc<dyn Trait> 注入到 API 层。
///
/// # Logic
/// 1. 加载并校验配置，失败时在任何 I/O 之前退出。
/// 2. 创建数据目录，初始化全局日志。
/// 3. 实例化数据源与预测服务。
/// 4. 执行一次启动更新，失败只记录日志。
/// 5. 启动 HTTP 服务，收到 Ctrl-C 后优雅退出。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // 1. 配置
    let config = settings::load_config(settings::CONFIG_FILE)?;

    // 2. 数据目录与日志
    let layout = DataLayout::new(&config.data.data_dir);
    layout.ensure_dirs()?;
    let _log_guard = logging::init(&layout.logs_dir());
    info!(
        "Yosoku starting: token={}, provider={}, training_days={}",
        config.forecast.token, config.forecast.provider, config.forecast.training_days
    );

    // 3. 基础设施层与应用服务层
    let provider = yosoku_feed::build_provider(
        &config.forecast,
        layout.raw_dir(config.forecast.provider),
    )?;
    let forecaster = Forecaster::new(provider, layout, config.forecast.clone());

    // 4. 启动时先更新一次数据与模型
    match forecaster.update().await {
        Ok(outcome) => info!("Startup update finished: {:?}", outcome),
        Err(e) => error!("Startup update failed: {}", e),
    }

    // 5. 对外提供服务
    let state = AppState { forecaster };
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    start_server(state, &bind_addr, shutdown_signal()).await?;

    info!("Shutdown signal received. Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
