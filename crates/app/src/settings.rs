use config::{Config, Environment, File};
use yosoku_core::config::{AppConfig, ConfigError};

/// 默认配置文件名 (不含扩展名)
pub const CONFIG_FILE: &str = "config";

/// 环境变量前缀，嵌套层级以双下划线分隔，例如 `YOSOKU__FORECAST__TOKEN`
pub const ENV_PREFIX: &str = "YOSOKU";

/// # Summary
/// 分层加载应用配置并校验。
///
/// # Logic
/// 1. 以 `AppConfig::default()` 作为最底层。
/// 2. 叠加可选的配置文件 (`{file}.toml`)。
/// 3. 叠加 `YOSOKU__` 前缀的环境变量。
/// 4. 反序列化后执行约束校验。
///
/// # Arguments
/// * `file`: 配置文件路径，不存在时忽略。
///
/// # Returns
/// 合法配置，或 `ConfigError::Load` / `ConfigError::Invalid`。
pub fn load_config(file: &str) -> Result<AppConfig, ConfigError> {
    let defaults = Config::try_from(&AppConfig::default()).map_err(load_error)?;
    let settings = Config::builder()
        .add_source(defaults)
        .add_source(File::with_name(file).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(load_error)?;

    let config: AppConfig = settings.try_deserialize().map_err(load_error)?;
    config.validate()?;
    Ok(config)
}

fn load_error(e: config::ConfigError) -> ConfigError {
    ConfigError::Load(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use yosoku_core::common::DataProvider;

    fn write_config(dir: &tempfile::TempDir, body: &str) -> String {
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        dir.path().join("config").to_string_lossy().into_owned()
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent").to_string_lossy()).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.forecast.token, "ETH");
        assert_eq!(config.forecast.training_days, 30);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_config(
            &dir,
            r#"
[server]
port = 9100

[forecast]
training_days = 7
provider = "coingecko"
cg_api_key = "demo-key"
"#,
        );
        let config = load_config(&file).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.forecast.training_days, 7);
        assert_eq!(config.forecast.provider, DataProvider::CoinGecko);
        assert!((config.forecast.bias_correction - 54.60).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_config(&dir, "[forecast]\nprovider = \"kraken\"\n");
        assert!(matches!(load_config(&file), Err(ConfigError::Load(_))));

        let file = write_config(&dir, "[forecast]\ntraining_days = \"abc\"\n");
        assert!(matches!(load_config(&file), Err(ConfigError::Load(_))));

        let file = write_config(&dir, "[forecast]\nprovider = \"coingecko\"\n");
        let err = load_config(&file).unwrap_err();
        assert!(err.to_string().contains("cg_api_key"));
    }
}
