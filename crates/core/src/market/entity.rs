use crate::common::Asset;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// # Summary
/// 单根 K 线数据实体，记录一个时间桶内的成交统计。
///
/// # Invariants
/// - `time` 为时间桶的结束时刻，保留原始的亚秒精度。
/// - 无成交量的数据源（CoinGecko）以 `0.0` 填充 `volume`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    // K 线结束时间
    pub time: DateTime<Utc>,
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价
    pub close: f64,
    // 成交量 (基础币)
    pub volume: f64,
    // 成交额 (计价币)
    pub quote_volume: Option<f64>,
    // 成交笔数
    pub trade_count: Option<u64>,
    // 主动买入成交量
    pub taker_volume: Option<f64>,
}

/// # Summary
/// 单一资产的 K 线时间序列表。
///
/// # Invariants
/// - `candles` 按 `time` 严格递增，时间戳唯一。
/// - 重复时间戳按拼接顺序保留最后一条 (keep-last)。
#[derive(Debug, Clone, PartialEq)]
pub struct AssetTable {
    asset: Asset,
    candles: Vec<Candle>,
}

impl AssetTable {
    /// # Summary
    /// 由任意顺序的 K 线构造资产表。
    ///
    /// # Logic
    /// 1. 按输入顺序写入以时间为键的有序映射，后写入者覆盖先写入者。
    /// 2. 按时间升序导出。
    ///
    /// # Arguments
    /// * `asset`: 资产标识。
    /// * `candles`: 拼接后的原始 K 线（可能乱序、可能重复）。
    ///
    /// # Returns
    /// 排序且去重后的资产表。
    pub fn new(asset: Asset, candles: impl IntoIterator<Item = Candle>) -> Self {
        let mut by_time = BTreeMap::new();
        for candle in candles {
            by_time.insert(candle.time, candle);
        }
        Self {
            asset,
            candles: by_time.into_values().collect(),
        }
    }

    /// 构造一个空表，表示该资产无可用数据。
    pub fn empty(asset: Asset) -> Self {
        Self {
            asset,
            candles: Vec::new(),
        }
    }

    pub fn asset(&self) -> Asset {
        self.asset
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// 最早与最晚的时间戳
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.candles.first(), self.candles.last()) {
            (Some(first), Some(last)) => Some((first.time, last.time)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candle(minute: u32, close: f64) -> Candle {
        Candle {
            time: Utc.with_ymd_and_hms(2026, 1, 1, 0, minute, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
            quote_volume: None,
            trade_count: None,
            taker_volume: None,
        }
    }

    #[test]
    fn test_asset_table_sorts_and_keeps_last_duplicate() {
        let table = AssetTable::new(
            Asset::Eth,
            vec![candle(2, 20.0), candle(1, 10.0), candle(2, 99.0), candle(0, 5.0)],
        );

        assert_eq!(table.len(), 3);
        let closes: Vec<f64> = table.candles().iter().map(|c| c.close).collect();
        assert_eq!(closes, vec![5.0, 10.0, 99.0]);
        assert_eq!(table.asset(), Asset::Eth);
    }

    #[test]
    fn test_empty_table_has_no_span() {
        let table = AssetTable::empty(Asset::Btc);
        assert!(table.is_empty());
        assert!(table.span().is_none());
    }
}
