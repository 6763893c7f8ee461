//! # 特征构造
//!
//! 在对齐后的宽表上计算固定的 80 列特征：
//! - 每个资产 open/high/low/close 的 1..9 阶滞后 (72 列)。
//! - 每个资产 close 的 10 阶滞后、5 期均线，以及 volume 的 1 阶滞后 (6 列)。
//! - ETH close 的 20 期指数均线与所在小时 (2 列)。
//!
//! 训练模式额外生成 `target_ETHUSDT`，即 360 行之后的 ETH close。

use crate::frame::{AlignedFrame, Metric};
use crate::table::FeatureTable;
use chrono::Timelike;
use tracing::debug;
use yosoku_core::common::Asset;
use yosoku_core::common::num::count_to_f64;
use yosoku_core::feature::error::FeatureError;

/// 价格滞后阶数上限 (1..=9)
pub const PRICE_LAGS: usize = 9;
/// close 额外的长滞后
pub const CLOSE_LONG_LAG: usize = 10;
/// close 简单均线窗口
pub const MA_WINDOW: usize = 5;
/// ETH close 指数均线跨度
pub const EMA_SPAN: usize = 20;
/// 目标列向前平移的行数 (1 分钟 K 线下为 6 小时)
pub const TARGET_HORIZON: usize = 360;
/// 目标列名
pub const TARGET_COLUMN: &str = "target_ETHUSDT";
/// 特征列总数
pub const FEATURE_COUNT: usize = 80;
/// 产出至少一行特征所需的对齐行数
pub const MIN_ALIGNED_ROWS: usize = CLOSE_LONG_LAG + 1;

/// 特征构造模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// 附加目标列，末尾 360 行因无目标被丢弃
    Training,
    /// 仅特征，用于实时推理
    Inference,
}

/// # Summary
/// 按固定顺序返回 80 个特征列名。
///
/// # Invariants
/// - 顺序：72 个价格滞后 (ETH 后 BTC；open/high/low/close；lag 1..9)，
///   随后 close_lag10、ma5、volume_lag1 (各自 ETH 后 BTC)，最后 ema20_ETHUSDT 与 hour_of_day。
pub fn feature_names() -> Vec<String> {
    let mut names = Vec::with_capacity(FEATURE_COUNT);
    for asset in Asset::FEATURE_ORDER {
        for metric in Metric::PRICES {
            for lag in 1..=PRICE_LAGS {
                names.push(format!("{}_{}_lag{}", metric.name(), asset.pair(), lag));
            }
        }
    }
    for asset in Asset::FEATURE_ORDER {
        names.push(format!("close_{}_lag{}", asset.pair(), CLOSE_LONG_LAG));
    }
    for asset in Asset::FEATURE_ORDER {
        names.push(format!("close_{}_ma{}", asset.pair(), MA_WINDOW));
    }
    for asset in Asset::FEATURE_ORDER {
        names.push(format!("volume_{}_lag1", asset.pair()));
    }
    names.push(format!("ema{}_{}", EMA_SPAN, Asset::Eth.pair()));
    names.push("hour_of_day".to_string());
    names
}

/// 按行向后平移 `n` 行，开头 `n` 行为缺失
pub fn shift(series: &[Option<f64>], n: usize) -> Vec<Option<f64>> {
    (0..series.len())
        .map(|i| i.checked_sub(n).and_then(|j| series[j]))
        .collect()
}

/// 按行向前平移 `n` 行，末尾 `n` 行为缺失
pub fn lead(series: &[Option<f64>], n: usize) -> Vec<Option<f64>> {
    (0..series.len())
        .map(|i| series.get(i + n).copied().flatten())
        .collect()
}

/// # Summary
/// 简单移动平均。
///
/// # Logic
/// 1. 窗口内任一值缺失或窗口未满时结果为缺失。
pub fn rolling_mean(series: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..series.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                return None;
            }
            let values: Option<Vec<f64>> = series[i + 1 - window..=i].iter().copied().collect();
            values.map(|v| v.iter().sum::<f64>() / count_to_f64(window))
        })
        .collect()
}

/// # Summary
/// 递推式指数移动平均，`alpha = 2 / (span + 1)`，不做偏差校正。
///
/// # Logic
/// 1. 首个有效值作为初始状态，旧权重为 1。
/// 2. 之后每一行 (含缺失行) 旧权重乘以 `1 - alpha`。
/// 3. 有效值处 `ema = (w * ema_prev + alpha * x) / (w + alpha)`，随后旧权重复位为 1。
/// 4. 缺失行输出缺失。
///
/// # Invariants
/// - 无缺失时退化为 `ema_t = alpha * x_t + (1 - alpha) * ema_{t-1}`。
/// - 缺失行按所在位置计入衰减，与按绝对位置加权的 pandas `ewm(adjust=False)` 一致。
pub fn ema(series: &[Option<f64>], span: usize) -> Vec<Option<f64>> {
    let alpha = 2.0 / (count_to_f64(span) + 1.0);
    let decay = 1.0 - alpha;
    let mut state: Option<f64> = None;
    let mut old_weight = 1.0;
    series
        .iter()
        .map(|value| {
            let Some(prev) = state else {
                state = *value;
                return *value;
            };
            old_weight *= decay;
            let x = (*value)?;
            let next = (old_weight * prev + alpha * x) / (old_weight + alpha);
            old_weight = 1.0;
            state = Some(next);
            Some(next)
        })
        .collect()
}

/// # Summary
/// 在对齐宽表上构造特征表。
///
/// # Logic
/// 1. 按固定顺序计算 80 列特征。
/// 2. 训练模式下计算 360 行之后的 ETH close 作为目标。
/// 3. 丢弃原始字段、特征或目标任一缺失的行。
///
/// # Arguments
/// * `frame`: 两个资产外连接后的宽表。
/// * `mode`: 训练或推理。
///
/// # Returns
/// 无缺失值的特征表，可能为空。
pub fn build_features(frame: &AlignedFrame, mode: BuildMode) -> Result<FeatureTable, FeatureError> {
    let mut columns: Vec<Vec<Option<f64>>> = Vec::with_capacity(FEATURE_COUNT);
    for asset in Asset::FEATURE_ORDER {
        for metric in Metric::PRICES {
            let series = frame.series(asset, metric);
            for lag in 1..=PRICE_LAGS {
                columns.push(shift(series, lag));
            }
        }
    }
    for asset in Asset::FEATURE_ORDER {
        columns.push(shift(frame.series(asset, Metric::Close), CLOSE_LONG_LAG));
    }
    for asset in Asset::FEATURE_ORDER {
        columns.push(rolling_mean(frame.series(asset, Metric::Close), MA_WINDOW));
    }
    for asset in Asset::FEATURE_ORDER {
        columns.push(shift(frame.series(asset, Metric::Volume), 1));
    }
    columns.push(ema(frame.series(Asset::Eth, Metric::Close), EMA_SPAN));
    columns.push(
        frame
            .index()
            .iter()
            .map(|t| Some(f64::from(t.hour())))
            .collect(),
    );

    let target = match mode {
        BuildMode::Training => Some(lead(frame.series(Asset::Eth, Metric::Close), TARGET_HORIZON)),
        BuildMode::Inference => None,
    };

    let mut index = Vec::new();
    let mut rows = Vec::new();
    let mut targets = Vec::new();
    for i in 0..frame.len() {
        if !frame.complete_at(i) {
            continue;
        }
        let row: Option<Vec<f64>> = columns.iter().map(|col| col[i]).collect();
        let Some(row) = row else { continue };
        if !row.iter().all(|v| v.is_finite()) {
            continue;
        }
        if let Some(target) = &target {
            match target[i] {
                Some(y) if y.is_finite() => targets.push(y),
                _ => continue,
            }
        }
        index.push(frame.index()[i]);
        rows.push(row);
    }
    debug!(
        "Built {} feature rows from {} aligned rows ({:?})",
        rows.len(),
        frame.len(),
        mode
    );

    let target = match mode {
        BuildMode::Training => Some((TARGET_COLUMN.to_string(), targets)),
        BuildMode::Inference => None,
    };
    FeatureTable::new(feature_names(), index, rows, target)
}
