use crate::common::DataProvider;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub forecast: ForecastConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// 原始文件、特征表与模型产物的根目录
    pub data_dir: String,
}

/// # Summary
/// 预测流水线配置。
///
/// # Invariants
/// - `provider` 为 `coingecko` 时 `cg_api_key` 必须非空。
/// - `bias_correction` 为加在模型原始输出上的固定偏移量。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    // 预测目标代币
    pub token: String,
    // 周期标签，仅用于日志
    pub timeframe: String,
    // 训练数据回溯天数
    pub training_days: u32,
    // Binance 实时接口的区域后缀 (com / us)
    pub region: String,
    // 行情数据源
    pub provider: DataProvider,
    // 推理输出的加性偏差修正
    pub bias_correction: f64,
    // 训练集占比
    pub train_ratio: f64,
    // CoinGecko API Key
    #[serde(default)]
    pub cg_api_key: Option<String>,
}

/// # Summary
/// 配置错误，在任何 I/O 之前抛出并原样返回给调用方。
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl AppConfig {
    /// # Summary
    /// 校验配置项之间的约束。
    ///
    /// # Logic
    /// 1. 代币与目录不得为空。
    /// 2. CoinGecko 数据源必须提供 API Key。
    /// 3. 训练天数、训练集占比与偏差修正必须在合法区间。
    ///
    /// # Returns
    /// 合法返回 Ok，否则返回 `ConfigError::Invalid`。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let forecast = &self.forecast;
        if forecast.token.trim().is_empty() {
            return Err(ConfigError::Invalid("forecast.token is empty".into()));
        }
        if self.data.data_dir.trim().is_empty() {
            return Err(ConfigError::Invalid("data.data_dir is empty".into()));
        }
        if forecast.training_days == 0 {
            return Err(ConfigError::Invalid(
                "forecast.training_days must be positive".into(),
            ));
        }
        if !(forecast.train_ratio > 0.0 && forecast.train_ratio < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "forecast.train_ratio must be in (0, 1), got {}",
                forecast.train_ratio
            )));
        }
        if !forecast.bias_correction.is_finite() {
            return Err(ConfigError::Invalid(
                "forecast.bias_correction must be finite".into(),
            ));
        }
        let has_key = forecast
            .cg_api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty());
        if forecast.provider == DataProvider::CoinGecko && !has_key {
            return Err(ConfigError::Invalid(
                "forecast.cg_api_key is required for the coingecko provider".into(),
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            data: DataConfig {
                data_dir: "data".to_string(),
            },
            forecast: ForecastConfig {
                token: "ETH".to_string(),
                timeframe: "6h".to_string(),
                training_days: 30,
                region: "com".to_string(),
                provider: DataProvider::Binance,
                bias_correction: 54.60,
                train_ratio: 0.8,
                cg_api_key: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.data.data_dir, "data");
        assert_eq!(config.forecast.token, "ETH");
        assert_eq!(config.forecast.provider, DataProvider::Binance);
        assert!((config.forecast.bias_correction - 54.60).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_coingecko_requires_api_key() {
        let mut config = AppConfig::default();
        config.forecast.provider = DataProvider::CoinGecko;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cg_api_key"));

        config.forecast.cg_api_key = Some("demo-key".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_ratio_and_days() {
        let mut config = AppConfig::default();
        config.forecast.train_ratio = 1.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.forecast.training_days = 0;
        assert!(config.validate().is_err());
    }
}
