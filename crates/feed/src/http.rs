use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use yosoku_core::market::error::MarketError;

/// 触发重试的 HTTP 状态码
pub const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// # Summary
/// 指数退避重试策略。
///
/// # Invariants
/// - 第 n 次重试前等待 `backoff_base * 2^(n-1)`。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    // 最大重试次数 (不含首次请求)
    pub max_retries: u32,
    // 退避基准时长
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            backoff_base: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    fn delay_before(&self, retry: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

/// # Summary
/// 带重试能力的 HTTP 抓取器，被各数据源共享。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端进行通讯。
/// - 404 不重试，直接返回 `MarketError::NotFound`。
#[derive(Clone)]
pub struct HttpFetcher {
    /// 内部使用的 HTTP 客户端
    client: Client,
    /// 重试策略
    policy: RetryPolicy,
}

impl HttpFetcher {
    /// # Summary
    /// 创建 HttpFetcher。
    ///
    /// # Logic
    /// 1. 若进程尚未安装 TLS 加密后端，则安装 ring 实现。
    /// 2. 配置 30 秒超时并构建 reqwest 客户端。
    ///
    /// # Arguments
    /// * `policy`: 重试策略。
    ///
    /// # Returns
    /// 成功返回抓取器，客户端构建失败返回 MarketError。
    pub fn new(policy: RetryPolicy) -> Result<Self, MarketError> {
        if rustls::crypto::CryptoProvider::get_default().is_none()
            && rustls::crypto::ring::default_provider()
                .install_default()
                .is_err()
        {
            debug!("TLS crypto provider was installed concurrently");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MarketError::Network(e.to_string()))?;

        Ok(Self { client, policy })
    }

    /// # Summary
    /// GET 请求并返回完整响应体。
    ///
    /// # Logic
    /// 1. 发送请求；网络错误或可重试状态码按退避策略重试。
    /// 2. 404 直接返回 NotFound。
    /// 3. 其余非成功状态码返回 Status 错误。
    ///
    /// # Arguments
    /// * `url`: 完整请求地址。
    ///
    /// # Returns
    /// 成功返回响应字节。
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, MarketError> {
        let mut retry = 0;
        loop {
            let outcome = self.client.get(url).send().await;
            let retryable = match outcome {
                Ok(resp) if resp.status().is_success() => {
                    let body = resp
                        .bytes()
                        .await
                        .map_err(|e| MarketError::Network(e.to_string()))?;
                    return Ok(body.to_vec());
                }
                Ok(resp) if resp.status() == StatusCode::NOT_FOUND => {
                    return Err(MarketError::NotFound);
                }
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if !RETRY_STATUSES.contains(&status) {
                        return Err(MarketError::Status {
                            status,
                            url: url.to_string(),
                        });
                    }
                    MarketError::Status {
                        status,
                        url: url.to_string(),
                    }
                }
                Err(e) => MarketError::Network(e.to_string()),
            };

            if retry >= self.policy.max_retries {
                return Err(retryable);
            }
            retry += 1;
            let delay = self.policy.delay_before(retry);
            debug!("Retry {} for {} in {:?}: {}", retry, url, delay, retryable);
            tokio::time::sleep(delay).await;
        }
    }

    /// # Summary
    /// 下载单个远端文件到本地路径。
    ///
    /// # Logic
    /// 1. `reuse_existing` 为真且目标文件已存在时跳过下载。
    /// 2. 下载内容先写入同目录临时文件，再重命名为目标文件。
    /// 3. 404 与其它失败只记录日志，返回 None。
    ///
    /// # Arguments
    /// * `url`: 远端地址。
    /// * `dest`: 本地目标路径。
    /// * `reuse_existing`: 是否复用已存在的本地文件。
    ///
    /// # Returns
    /// 文件可用时返回其路径。
    pub async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        reuse_existing: bool,
    ) -> Option<PathBuf> {
        if reuse_existing && tokio::fs::try_exists(dest).await.unwrap_or(false) {
            debug!("{} already exists, skipping download", dest.display());
            return Some(dest.to_path_buf());
        }

        let body = match self.get_bytes(url).await {
            Ok(body) => body,
            Err(MarketError::NotFound) => {
                info!("File not found (404): {}", url);
                return None;
            }
            Err(e) => {
                warn!("Failed to download {}: {}", url, e);
                return None;
            }
        };

        match write_via_temp(dest, &body).await {
            Ok(()) => {
                debug!("Downloaded {} to {}", url, dest.display());
                Some(dest.to_path_buf())
            }
            Err(e) => {
                warn!("Failed to write {}: {}", dest.display(), e);
                None
            }
        }
    }
}

async fn write_via_temp(dest: &Path, body: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut tmp_name = dest.as_os_str().to_owned();
    tmp_name.push(".part");
    let tmp = PathBuf::from(tmp_name);
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, dest).await
}
