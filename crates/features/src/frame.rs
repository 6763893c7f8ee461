use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use yosoku_core::common::Asset;
use yosoku_core::market::entity::AssetTable;

/// 参与对齐的原始 K 线字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Metric {
    /// 参与滞后特征的价格字段，顺序固定
    pub const PRICES: [Metric; 4] = [Metric::Open, Metric::High, Metric::Low, Metric::Close];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Open => "open",
            Metric::High => "high",
            Metric::Low => "low",
            Metric::Close => "close",
            Metric::Volume => "volume",
        }
    }
}

/// 单个资产在对齐后的列，缺失的时间点为 None
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetColumns {
    pub open: Vec<Option<f64>>,
    pub high: Vec<Option<f64>>,
    pub low: Vec<Option<f64>>,
    pub close: Vec<Option<f64>>,
    pub volume: Vec<Option<f64>>,
}

impl AssetColumns {
    pub fn get(&self, metric: Metric) -> &[Option<f64>] {
        match metric {
            Metric::Open => &self.open,
            Metric::High => &self.high,
            Metric::Low => &self.low,
            Metric::Close => &self.close,
            Metric::Volume => &self.volume,
        }
    }

    fn push(&mut self, candle: Option<&yosoku_core::market::entity::Candle>) {
        self.open.push(candle.map(|c| c.open));
        self.high.push(candle.map(|c| c.high));
        self.low.push(candle.map(|c| c.low));
        self.close.push(candle.map(|c| c.close));
        self.volume.push(candle.map(|c| c.volume));
    }

    // 该行所有原始字段是否齐全
    fn complete_at(&self, row: usize) -> bool {
        [&self.open, &self.high, &self.low, &self.close, &self.volume]
            .iter()
            .all(|col| matches!(col.get(row), Some(Some(v)) if v.is_finite()))
    }
}

/// # Summary
/// 两个资产按时间戳外连接后的宽表。
///
/// # Invariants
/// - `index` 严格递增，为两个资产时间戳的并集。
/// - 每个资产的每一列长度都等于 `index.len()`。
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedFrame {
    index: Vec<DateTime<Utc>>,
    eth: AssetColumns,
    btc: AssetColumns,
}

impl AlignedFrame {
    /// # Summary
    /// 以时间戳外连接两个资产表。
    ///
    /// # Logic
    /// 1. 取两个表时间戳的并集并排序。
    /// 2. 双指针遍历两个有序表，某资产在该时刻无数据时填 None。
    ///
    /// # Arguments
    /// * `eth`: ETH 资产表。
    /// * `btc`: BTC 资产表。
    ///
    /// # Returns
    /// 对齐后的宽表。
    pub fn align(eth: &AssetTable, btc: &AssetTable) -> Self {
        let index: Vec<DateTime<Utc>> = eth
            .candles()
            .iter()
            .chain(btc.candles())
            .map(|c| c.time)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Self {
            eth: Self::project(&index, eth),
            btc: Self::project(&index, btc),
            index,
        }
    }

    fn project(index: &[DateTime<Utc>], table: &AssetTable) -> AssetColumns {
        let mut columns = AssetColumns::default();
        let mut candles = table.candles().iter().peekable();
        for time in index {
            let hit = candles.next_if(|c| c.time == *time);
            columns.push(hit);
        }
        columns
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn columns(&self, asset: Asset) -> &AssetColumns {
        match asset {
            Asset::Eth => &self.eth,
            Asset::Btc => &self.btc,
        }
    }

    pub fn series(&self, asset: Asset, metric: Metric) -> &[Option<f64>] {
        self.columns(asset).get(metric)
    }

    /// 该行两个资产的原始字段是否都齐全
    pub fn complete_at(&self, row: usize) -> bool {
        self.eth.complete_at(row) && self.btc.complete_at(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use yosoku_core::market::entity::Candle;

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
    fn test_outer_join_fills_gaps_with_none() {
        let eth = AssetTable::new(Asset::Eth, vec![candle(0, 10.0), candle(1, 11.0), candle(3, 13.0)]);
        let btc = AssetTable::new(Asset::Btc, vec![candle(1, 100.0), candle(2, 102.0), candle(3, 103.0)]);

        let frame = AlignedFrame::align(&eth, &btc);
        assert_eq!(frame.len(), 4);
        assert_eq!(
            frame.series(Asset::Eth, Metric::Close),
            &[Some(10.0), Some(11.0), None, Some(13.0)]
        );
        assert_eq!(
            frame.series(Asset::Btc, Metric::Close),
            &[None, Some(100.0), Some(102.0), Some(103.0)]
        );
        assert!(!frame.complete_at(0));
        assert!(frame.complete_at(1));
        assert!(!frame.complete_at(2));
        assert!(frame.complete_at(3));
    }

    #[test]
    fn test_align_empty_tables() {
        let frame = AlignedFrame::align(&AssetTable::empty(Asset::Eth), &AssetTable::empty(Asset::Btc));
        assert!(frame.is_empty());
    }
}
