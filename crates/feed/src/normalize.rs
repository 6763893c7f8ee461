//! # 原始记录归一化
//!
//! 将各数据源格式各异的原始 K 线记录解析为统一的 [`Candle`] 序列：
//! - Binance 日归档：zip 内单个 CSV，可能带表头，`end_time` 精度随年代变化。
//! - Binance 实时 klines：JSON 数组，价格以字符串表示。
//! - CoinGecko OHLC：JSON 数组 `[timestamp_ms, open, high, low, close]`，无成交量。

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use yosoku_core::common::Asset;
use yosoku_core::common::num::{floor_to_u64, round_to_i64};
use yosoku_core::market::entity::{AssetTable, Candle};
use yosoku_core::market::error::MarketError;

/// Binance 归档表头的首个列名
pub const ARCHIVE_HEADER_TOKEN: &str = "open_time";

/// 归档 CSV 使用的前 11 列
pub const ARCHIVE_COLUMNS: [&str; 11] = [
    "start_time",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "end_time",
    "volume_usd",
    "n_trades",
    "taker_volume",
    "taker_volume_usd",
];

/// # Summary
/// 原始时间戳精度。
///
/// # Invariants
/// - 按单个文件中 `end_time` 的最大值判定：
///   `> 1e15` 为纳秒，`> 1e12` 为微秒，其余为毫秒。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampUnit {
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl TimestampUnit {
    /// 超过该值视为微秒
    pub const MICROS_ABOVE: i64 = 1_000_000_000_000;
    /// 超过该值视为纳秒
    pub const NANOS_ABOVE: i64 = 1_000_000_000_000_000;

    /// 根据一批时间戳的最大值推断精度
    pub fn detect(max_value: i64) -> Self {
        if max_value > Self::NANOS_ABOVE {
            TimestampUnit::Nanoseconds
        } else if max_value > Self::MICROS_ABOVE {
            TimestampUnit::Microseconds
        } else {
            TimestampUnit::Milliseconds
        }
    }

    fn nanos_per_unit(&self) -> i64 {
        match self {
            TimestampUnit::Milliseconds => 1_000_000,
            TimestampUnit::Microseconds => 1_000,
            TimestampUnit::Nanoseconds => 1,
        }
    }

    /// # Summary
    /// 将原始结束时间按本精度转换为时间桶结束时刻。
    ///
    /// # Logic
    /// 1. 按精度换算为纳秒，保留全部亚秒精度，不同时间桶不会合并。
    ///
    /// # Returns
    /// 超出可表示范围时返回 None。
    pub fn to_datetime(&self, raw: i64) -> Option<DateTime<Utc>> {
        raw.checked_mul(self.nanos_per_unit())
            .map(DateTime::from_timestamp_nanos)
    }
}

// 单行归档记录，时间戳精度尚未确定
struct ArchiveRow {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    end_time: i64,
    volume_usd: f64,
    n_trades: u64,
    taker_volume: f64,
}

fn parse_f64(field: &str, column: &str) -> Result<f64, MarketError> {
    field
        .trim()
        .parse::<f64>()
        .map_err(|e| MarketError::Parse(format!("column {}: {:?}: {}", column, field, e)))
}

fn parse_i64(field: &str, column: &str) -> Result<i64, MarketError> {
    let trimmed = field.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(v);
    }
    // 个别年代的归档以浮点记法写出时间戳
    let v = parse_f64(trimmed, column)?;
    round_to_i64(v).ok_or_else(|| MarketError::Parse(format!("column {}: {:?}", column, field)))
}

/// 判断归档 CSV 的首行是否为表头
pub fn has_archive_header(content: &[u8]) -> bool {
    let first_line = content.split(|b| *b == b'\n').next().unwrap_or_default();
    String::from_utf8_lossy(first_line)
        .trim_start_matches('\u{feff}')
        .starts_with(ARCHIVE_HEADER_TOKEN)
}

/// # Summary
/// 解析单日归档 CSV 内容。
///
/// # Logic
/// 1. 根据首行是否以 `open_time` 开头决定是否跳过表头。
/// 2. 取每行前 11 列解析为数值，列数不足或数值非法即判定整个文件损坏。
/// 3. 以本文件 `end_time` 最大值推断时间戳精度。
/// 4. 转换为规范时间戳的 Candle。
///
/// # Arguments
/// * `content`: 解压后的 CSV 字节。
///
/// # Returns
/// 成功返回该文件中的全部 K 线 (按文件内顺序)。
pub fn parse_archive_csv(content: &[u8]) -> Result<Vec<Candle>, MarketError> {
    let has_header = has_archive_header(content);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .flexible(true)
        .from_reader(content);

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| MarketError::Parse(e.to_string()))?;
        if record.len() < ARCHIVE_COLUMNS.len() {
            return Err(MarketError::Parse(format!(
                "row {} has {} columns, expected at least {}",
                line,
                record.len(),
                ARCHIVE_COLUMNS.len()
            )));
        }
        let field = |i: usize| record.get(i).unwrap_or_default();
        let n_trades = parse_f64(field(8), ARCHIVE_COLUMNS[8])?;
        rows.push(ArchiveRow {
            open: parse_f64(field(1), ARCHIVE_COLUMNS[1])?,
            high: parse_f64(field(2), ARCHIVE_COLUMNS[2])?,
            low: parse_f64(field(3), ARCHIVE_COLUMNS[3])?,
            close: parse_f64(field(4), ARCHIVE_COLUMNS[4])?,
            volume: parse_f64(field(5), ARCHIVE_COLUMNS[5])?,
            end_time: parse_i64(field(6), ARCHIVE_COLUMNS[6])?,
            volume_usd: parse_f64(field(7), ARCHIVE_COLUMNS[7])?,
            n_trades: floor_to_u64(n_trades).unwrap_or_default(),
            taker_volume: parse_f64(field(9), ARCHIVE_COLUMNS[9])?,
        });
    }

    let Some(max_end) = rows.iter().map(|r| r.end_time).max() else {
        return Ok(Vec::new());
    };
    let unit = TimestampUnit::detect(max_end);
    debug!("Archive end_time max {} detected as {:?}", max_end, unit);

    rows.into_iter()
        .map(|row| {
            let time = unit.to_datetime(row.end_time).ok_or_else(|| {
                MarketError::Parse(format!("end_time out of range: {}", row.end_time))
            })?;
            Ok(Candle {
                time,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
                quote_volume: Some(row.volume_usd),
                trade_count: Some(row.n_trades),
                taker_volume: Some(row.taker_volume),
            })
        })
        .collect()
}

/// # Summary
/// 读取单个 Binance zip 归档。
///
/// # Logic
/// 1. 打开 zip 并读取第一个条目。
/// 2. 交由 `parse_archive_csv` 解析。
pub fn read_archive(path: &Path) -> Result<Vec<Candle>, MarketError> {
    let file = File::open(path).map_err(|e| MarketError::Io(format!("{}: {}", path.display(), e)))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| MarketError::Parse(e.to_string()))?;
    let mut entry = archive
        .by_index(0)
        .map_err(|e| MarketError::Parse(e.to_string()))?;
    let mut content = Vec::new();
    entry
        .read_to_end(&mut content)
        .map_err(|e| MarketError::Io(e.to_string()))?;
    parse_archive_csv(&content)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// # Summary
/// 将某资产的全部 Binance 归档文件归一化为资产表。
///
/// # Logic
/// 1. 只保留文件名含交易对且以 `.zip` 结尾的文件，并按路径排序。
/// 2. 逐个解析，失败的文件记录日志后跳过。
/// 3. 按排序后的顺序拼接，交由 AssetTable 排序去重 (keep-last)。
pub fn normalize_archives(asset: Asset, files: &[PathBuf]) -> AssetTable {
    let mut selected: Vec<&PathBuf> = files
        .iter()
        .filter(|p| {
            let name = file_name(p);
            name.contains(asset.pair()) && name.ends_with(".zip")
        })
        .collect();
    selected.sort();

    let mut candles = Vec::new();
    for path in selected {
        match read_archive(path) {
            Ok(parsed) => {
                debug!("Processed {} with {} rows", path.display(), parsed.len());
                candles.extend(parsed);
            }
            Err(e) => {
                warn!("Error processing {}: {}", path.display(), e);
            }
        }
    }

    let table = AssetTable::new(asset, candles);
    info!("{} archive rows after normalization: {}", asset.pair(), table.len());
    table
}

fn value_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(round_to_i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// # Summary
/// 解析 CoinGecko OHLC JSON。
///
/// # Logic
/// 1. 每条记录为 `[timestamp_ms, open, high, low, close]`。
/// 2. 无成交量字段，`volume` 以 0.0 填充以保持特征集完整。
pub fn parse_coingecko_ohlc(content: &[u8]) -> Result<Vec<Candle>, MarketError> {
    let records: Vec<Vec<Value>> =
        serde_json::from_slice(content).map_err(|e| MarketError::Parse(e.to_string()))?;

    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let field = |idx: usize| {
                record.get(idx).and_then(value_f64).ok_or_else(|| {
                    MarketError::Parse(format!("record {} field {} is not numeric", i, idx))
                })
            };
            let ts = record.first().and_then(value_i64).ok_or_else(|| {
                MarketError::Parse(format!("record {} has no timestamp", i))
            })?;
            let time = TimestampUnit::Milliseconds
                .to_datetime(ts)
                .ok_or_else(|| MarketError::Parse(format!("timestamp out of range: {}", ts)))?;
            Ok(Candle {
                time,
                open: field(1)?,
                high: field(2)?,
                low: field(3)?,
                close: field(4)?,
                volume: 0.0,
                quote_volume: None,
                trade_count: None,
                taker_volume: None,
            })
        })
        .collect()
}

/// # Summary
/// 将某资产的 CoinGecko JSON 文件归一化为资产表。
///
/// # Logic
/// 1. 只保留 `.json` 文件并排序。
/// 2. 逐个解析，失败跳过；拼接后排序去重。
pub fn normalize_coingecko_files(asset: Asset, files: &[PathBuf]) -> AssetTable {
    let mut selected: Vec<&PathBuf> = files
        .iter()
        .filter(|p| file_name(p).ends_with(".json"))
        .collect();
    selected.sort();

    let mut candles = Vec::new();
    for path in selected {
        let parsed = std::fs::read(path)
            .map_err(|e| MarketError::Io(e.to_string()))
            .and_then(|content| parse_coingecko_ohlc(&content));
        match parsed {
            Ok(parsed) => {
                debug!("Processed {} with {} rows", path.display(), parsed.len());
                candles.extend(parsed);
            }
            Err(e) => warn!("Error processing {}: {}", path.display(), e),
        }
    }

    let table = AssetTable::new(asset, candles);
    info!("{} coingecko rows after normalization: {}", asset.pair(), table.len());
    table
}

/// # Summary
/// 解析 Binance `/api/v3/klines` 实时响应。
///
/// # Logic
/// 1. 每条记录至少 11 个字段，价格与成交量可能为字符串。
/// 2. 以整个响应中 `close_time` 的最大值推断精度，与归档文件使用同一判定规则，
///    保证训练与推理的时间特征语义一致。
pub fn parse_binance_klines(content: &[u8]) -> Result<Vec<Candle>, MarketError> {
    let records: Vec<Vec<Value>> =
        serde_json::from_slice(content).map_err(|e| MarketError::Parse(e.to_string()))?;

    let mut parsed = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        if record.len() < ARCHIVE_COLUMNS.len() {
            return Err(MarketError::Parse(format!(
                "kline {} has {} fields",
                i,
                record.len()
            )));
        }
        let num = |idx: usize| {
            record.get(idx).and_then(value_f64).ok_or_else(|| {
                MarketError::Parse(format!("kline {} field {} is not numeric", i, idx))
            })
        };
        let close_time = record
            .get(6)
            .and_then(value_i64)
            .ok_or_else(|| MarketError::Parse(format!("kline {} has no close time", i)))?;
        parsed.push((
            close_time,
            ArchiveRow {
                open: num(1)?,
                high: num(2)?,
                low: num(3)?,
                close: num(4)?,
                volume: num(5)?,
                end_time: close_time,
                volume_usd: num(7)?,
                n_trades: record
                    .get(8)
                    .and_then(value_i64)
                    .and_then(|n| u64::try_from(n).ok())
                    .unwrap_or_default(),
                taker_volume: num(9)?,
            },
        ));
    }

    let Some(max_close) = parsed.iter().map(|(t, _)| *t).max() else {
        return Ok(Vec::new());
    };
    let unit = TimestampUnit::detect(max_close);

    parsed
        .into_iter()
        .map(|(close_time, row)| {
            let time = unit.to_datetime(close_time).ok_or_else(|| {
                MarketError::Parse(format!("close time out of range: {}", close_time))
            })?;
            Ok(Candle {
                time,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
                quote_volume: Some(row.volume_usd),
                trade_count: Some(row.n_trades),
                taker_volume: Some(row.taker_volume),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    // 2026-01-01 00:00:00 UTC 的毫秒时间戳
    const DAY_START_MS: i64 = 1_767_225_600_000;

    fn archive_line(minute: i64, close: f64, scale: i64) -> String {
        let start = DAY_START_MS + minute * 60_000;
        let end = start + 59_999;
        format!(
            "{},{},{},{},{},12.5,{},1000.0,42,6.0,500.0,0",
            start * scale,
            close - 1.0,
            close + 2.0,
            close - 2.0,
            close,
            end * scale
        )
    }

    fn write_zip(dir: &Path, name: &str, csv: &str) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file(name.replace(".zip", ".csv"), zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(csv.as_bytes()).unwrap();
        writer.finish().unwrap();
        path
    }

    #[test]
    fn test_unit_detection_boundaries() {
        assert_eq!(TimestampUnit::detect(999_999_999_999), TimestampUnit::Milliseconds);
        assert_eq!(TimestampUnit::detect(1_000_000_000_000), TimestampUnit::Milliseconds);
        assert_eq!(TimestampUnit::detect(1_000_000_000_001), TimestampUnit::Microseconds);
        assert_eq!(TimestampUnit::detect(1_000_000_000_000_000), TimestampUnit::Microseconds);
        assert_eq!(TimestampUnit::detect(1_000_000_000_000_001), TimestampUnit::Nanoseconds);
        assert_eq!(TimestampUnit::detect(i64::MAX), TimestampUnit::Nanoseconds);
    }

    #[test]
    fn test_unit_conversion() {
        let expected = Utc.with_ymd_and_hms(2001, 9, 9, 1, 46, 40).unwrap();
        assert_eq!(TimestampUnit::Milliseconds.to_datetime(1_000_000_000_000), Some(expected));
        assert_eq!(TimestampUnit::Microseconds.to_datetime(1_000_000_000_000_000), Some(expected));
        assert_eq!(TimestampUnit::Nanoseconds.to_datetime(1_000_000_000_000_000_000), Some(expected));
        assert_eq!(TimestampUnit::Milliseconds.to_datetime(i64::MAX), None);
    }

    #[test]
    fn test_header_detection() {
        let with_header = format!(
            "open_time,open,high,low,close,volume,close_time,quote_volume,count,taker_buy_volume,taker_buy_quote_volume,ignore\n{}\n",
            archive_line(0, 100.0, 1)
        );
        let without_header = format!("{}\n{}\n", archive_line(0, 100.0, 1), archive_line(1, 101.0, 1));
        assert!(has_archive_header(with_header.as_bytes()));
        assert!(!has_archive_header(without_header.as_bytes()));

        assert_eq!(parse_archive_csv(with_header.as_bytes()).unwrap().len(), 1);
        assert_eq!(parse_archive_csv(without_header.as_bytes()).unwrap().len(), 2);
    }

    #[test]
    fn test_unit_is_detected_per_file() {
        // 两个年代的文件以不同精度记录同一分钟，逐文件判定后落在同一时刻
        let coarse = parse_archive_csv(archive_line(5, 100.0, 1).as_bytes()).unwrap();
        let fine = parse_archive_csv(archive_line(5, 100.0, 1_000).as_bytes()).unwrap();
        assert_eq!(coarse[0].time, fine[0].time);
        assert_eq!(coarse[0].close, 100.0);
        assert_eq!(coarse[0].volume, 12.5);
        assert_eq!(coarse[0].trade_count, Some(42));

        // 早期毫秒值走毫秒分支
        let early = "0,1,2,0.5,1.5,3,999999999999,1,1,1,1\n";
        let candles = parse_archive_csv(early.as_bytes()).unwrap();
        assert_eq!(
            candles[0].time,
            Utc.timestamp_millis_opt(999_999_999_999).unwrap()
        );
    }

    #[test]
    fn test_consecutive_minutes_stay_distinct() {
        let csv: String = (0..5).map(|m| archive_line(m, 100.0 + m as f64, 1) + "\n").collect();
        let candles = parse_archive_csv(csv.as_bytes()).unwrap();
        let table = AssetTable::new(Asset::Eth, candles);
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_short_row_rejects_file() {
        let err = parse_archive_csv(b"1,2,3,4,5\n").unwrap_err();
        assert!(matches!(err, MarketError::Parse(_)));
    }

    #[test]
    fn test_normalize_archives_skips_bad_files_and_keeps_last() {
        let dir = tempfile::tempdir().unwrap();
        let day1 = format!("{}\n{}\n", archive_line(0, 100.0, 1), archive_line(1, 101.0, 1));
        // 与 day1 重叠一分钟，排序在后的文件胜出
        let day2 = format!("{}\n{}\n", archive_line(1, 555.0, 1), archive_line(2, 102.0, 1));
        let files = vec![
            write_zip(dir.path(), "ETHUSDT-1m-2026-01-02.zip", &day2),
            write_zip(dir.path(), "ETHUSDT-1m-2026-01-01.zip", &day1),
            write_zip(dir.path(), "ETHUSDT-1m-2026-01-03.zip", "garbage,row\n"),
            write_zip(dir.path(), "BTCUSDT-1m-2026-01-01.zip", &day1),
        ];

        let table = normalize_archives(Asset::Eth, &files);
        let closes: Vec<f64> = table.candles().iter().map(|c| c.close).collect();
        assert_eq!(closes, vec![100.0, 555.0, 102.0]);
    }

    #[test]
    fn test_normalize_archives_with_no_valid_files_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("ETHUSDT-1m-2026-01-01.zip");
        let table = normalize_archives(Asset::Eth, &[missing]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_parse_coingecko_ohlc() {
        let json = br#"[[1767225600000, 100.5, 101.0, 99.0, 100.0], [1767227400000, 100.0, 102.0, 99.5, 101.5]]"#;
        let candles = parse_coingecko_ohlc(json).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].time, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(candles[1].close, 101.5);
        assert_eq!(candles[1].volume, 0.0);

        assert!(parse_coingecko_ohlc(br#"[[1767225600000, "x"]]"#).is_err());
    }

    #[test]
    fn test_parse_binance_klines_matches_archive_semantics() {
        let json = br#"[[1767225600000,"100.0","101.0","99.0","100.5","12.0",1767225659999,"1200.0",10,"6.0","600.0","0"]]"#;
        let candles = parse_binance_klines(json).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].close, 100.5);
        assert_eq!(candles[0].volume, 12.0);
        assert_eq!(candles[0].trade_count, Some(10));

        let archived = parse_archive_csv(archive_line(0, 100.5, 1).as_bytes()).unwrap();
        assert_eq!(candles[0].time, archived[0].time);
    }
}
