use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub mod num;
pub mod time;

/// # Summary
/// 参与建模的资产枚举，目前固定为 BTC 与 ETH 两个标的。
///
/// # Invariants
/// - 所有资产均以 USDT 计价，交易对名称为 `{SYMBOL}USDT`。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Asset {
    // 比特币
    Btc,
    // 以太坊
    Eth,
}

impl Asset {
    /// 特征列的固定资产顺序：ETH 在前，BTC 在后。
    pub const FEATURE_ORDER: [Asset; 2] = [Asset::Eth, Asset::Btc];

    /// 资产代码，例如 `ETH`。
    pub fn symbol(&self) -> &'static str {
        match self {
            Asset::Btc => "BTC",
            Asset::Eth => "ETH",
        }
    }

    /// 交易对名称，同时用作特征列后缀，例如 `ETHUSDT`。
    pub fn pair(&self) -> &'static str {
        match self {
            Asset::Btc => "BTCUSDT",
            Asset::Eth => "ETHUSDT",
        }
    }
}

impl FromStr for Asset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BTC" | "BTCUSDT" => Ok(Asset::Btc),
            "ETH" | "ETHUSDT" => Ok(Asset::Eth),
            _ => Err(format!("Unknown asset: {}", s)),
        }
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// # Summary
/// 行情数据源枚举，决定下载方式以及原始记录的解析分支。
///
/// # Invariants
/// - 配置文件中以小写字符串 `binance` / `coingecko` 表示。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DataProvider {
    // Binance 日归档 zip + 实时 klines 接口
    Binance,
    // CoinGecko OHLC JSON 接口
    #[serde(rename = "coingecko")]
    CoinGecko,
}

impl FromStr for DataProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "binance" => Ok(DataProvider::Binance),
            "coingecko" => Ok(DataProvider::CoinGecko),
            _ => Err(format!("Unsupported data provider: {}", s)),
        }
    }
}

impl std::fmt::Display for DataProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataProvider::Binance => write!(f, "binance"),
            DataProvider::CoinGecko => write!(f, "coingecko"),
        }
    }
}
