use crate::table::FeatureTable;
use serde::{Deserialize, Serialize};
use tracing::info;
use yosoku_core::common::num::{count_to_f64, floor_to_u64};
use yosoku_core::feature::error::FeatureError;

/// # Summary
/// 逐列标准化器：`scaled = (raw - mean) / scale`。
///
/// # Invariants
/// - `columns`、`mean`、`scale` 长度一致，顺序即特征顺序。
/// - `scale` 为总体标准差；方差为 0 的列取 1.0。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub columns: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// # Summary
    /// 在给定样本上拟合每列的均值与总体标准差。
    ///
    /// # Arguments
    /// * `columns`: 特征列名。
    /// * `rows`: 行优先样本，至少一行。
    pub fn fit(columns: &[String], rows: &[Vec<f64>]) -> Result<Self, FeatureError> {
        if rows.is_empty() {
            return Err(FeatureError::InsufficientData {
                required: 1,
                available: 0,
            });
        }
        let width = columns.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(FeatureError::DimensionMismatch {
                expected: width,
                got: bad.len(),
            });
        }

        let n = count_to_f64(rows.len());
        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; width];
        for row in rows {
            for ((acc, v), m) in var.iter_mut().zip(row).zip(&mean) {
                *acc += (v - m) * (v - m);
            }
        }
        let scale = var
            .into_iter()
            .map(|acc| {
                let std = (acc / n).sqrt();
                if std > 0.0 && std.is_finite() { std } else { 1.0 }
            })
            .collect();

        Ok(Self {
            columns: columns.to_vec(),
            mean,
            scale,
        })
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// 标准化单行
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, FeatureError> {
        if row.len() != self.width() {
            return Err(FeatureError::DimensionMismatch {
                expected: self.width(),
                got: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, FeatureError> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }

    /// 校验特征表的列与拟合时完全一致
    pub fn check_columns(&self, columns: &[String]) -> Result<(), FeatureError> {
        if columns.len() != self.width() {
            return Err(FeatureError::DimensionMismatch {
                expected: self.width(),
                got: columns.len(),
            });
        }
        let missing: Vec<String> = self
            .columns
            .iter()
            .zip(columns)
            .filter(|(expected, got)| expected != got)
            .map(|(expected, _)| expected.clone())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FeatureError::MissingColumns(missing))
        }
    }
}

/// # Summary
/// 按时间顺序切分并标准化后的数据集。
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub train_x: Vec<Vec<f64>>,
    pub test_x: Vec<Vec<f64>>,
    pub train_y: Vec<f64>,
    pub test_y: Vec<f64>,
    pub scaler: StandardScaler,
}

/// 训练集行数 `floor(n * ratio)`
pub fn split_index(n: usize, ratio: f64) -> usize {
    floor_to_u64(count_to_f64(n) * ratio)
        .and_then(|idx| usize::try_from(idx).ok())
        .map_or(0, |idx| idx.min(n))
}

/// # Summary
/// 按时间顺序切分特征表，只在训练部分上拟合标准化器并应用到两部分。
///
/// # Logic
/// 1. 前 `floor(n * ratio)` 行为训练集，其余为测试集，不打乱。
/// 2. 在训练特征上拟合标准化器。
/// 3. 标准化训练与测试特征，目标值不做变换。
///
/// # Arguments
/// * `table`: 带目标列的特征表。
/// * `ratio`: 训练集占比，取值 (0, 1)。
///
/// # Returns
/// 训练集为空或缺少目标列时返回 FeatureError。
pub fn split_and_scale(table: &FeatureTable, ratio: f64) -> Result<DatasetSplit, FeatureError> {
    let target = table
        .target()
        .ok_or_else(|| FeatureError::MissingColumns(vec![crate::builder::TARGET_COLUMN.to_string()]))?;
    let split = split_index(table.len(), ratio);
    if split == 0 {
        return Err(FeatureError::InsufficientData {
            required: 2,
            available: table.len(),
        });
    }

    let (train_rows, test_rows) = table.rows().split_at(split);
    let (train_y, test_y) = target.split_at(split);
    let scaler = StandardScaler::fit(table.columns(), train_rows)?;
    info!(
        "Split {} rows into {} train / {} test",
        table.len(),
        train_rows.len(),
        test_rows.len()
    );

    Ok(DatasetSplit {
        train_x: scaler.transform(train_rows)?,
        test_x: scaler.transform(test_rows)?,
        train_y: train_y.to_vec(),
        test_y: test_y.to_vec(),
        scaler,
    })
}
