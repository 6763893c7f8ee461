use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// 滚动日志文件名前缀
const LOG_FILE_PREFIX: &str = "yosoku.log";

/// # Summary
/// 初始化全局日志：标准输出 + 按天滚动的日志文件。
///
/// # Arguments
/// * `logs_dir`: 日志文件目录。
///
/// # Returns
/// 文件写入线程的守卫，需持有至进程结束以保证日志刷盘。
pub fn init(logs_dir: &Path) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    guard
}
