use chrono::{DateTime, NaiveDateTime, Utc};
use std::io::{Read, Write};
use tracing::debug;
use yosoku_core::feature::error::FeatureError;

/// 特征表 CSV 的时间列名
pub const DATE_COLUMN: &str = "date";
/// 特征表 CSV 的时间格式
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// # Summary
/// 无缺失值的特征矩阵，按时间升序排列。
///
/// # Invariants
/// - `rows` 中每一行长度等于 `columns.len()`。
/// - `index.len() == rows.len()`，若存在目标列则长度同样一致。
/// - 所有取值均为有限数。
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    columns: Vec<String>,
    index: Vec<DateTime<Utc>>,
    rows: Vec<Vec<f64>>,
    target: Option<Vec<f64>>,
    target_name: Option<String>,
}

impl FeatureTable {
    /// # Summary
    /// 构造特征表并校验维度。
    ///
    /// # Arguments
    /// * `columns`: 特征列名 (有序)。
    /// * `index`: 每行的时间戳。
    /// * `rows`: 行优先的特征值。
    /// * `target`: 可选的 (目标列名, 目标值)。
    ///
    /// # Returns
    /// 维度不一致时返回 `FeatureError::DimensionMismatch`。
    pub fn new(
        columns: Vec<String>,
        index: Vec<DateTime<Utc>>,
        rows: Vec<Vec<f64>>,
        target: Option<(String, Vec<f64>)>,
    ) -> Result<Self, FeatureError> {
        if index.len() != rows.len() {
            return Err(FeatureError::DimensionMismatch {
                expected: index.len(),
                got: rows.len(),
            });
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != columns.len()) {
            return Err(FeatureError::DimensionMismatch {
                expected: columns.len(),
                got: bad.len(),
            });
        }
        if let Some((_, values)) = &target {
            if values.len() != rows.len() {
                return Err(FeatureError::DimensionMismatch {
                    expected: rows.len(),
                    got: values.len(),
                });
            }
        }
        let (target_name, target) = match target {
            Some((name, values)) => (Some(name), Some(values)),
            None => (None, None),
        };
        Ok(Self {
            columns,
            index,
            rows,
            target,
            target_name,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn target(&self) -> Option<&[f64]> {
        self.target.as_deref()
    }

    pub fn target_name(&self) -> Option<&str> {
        self.target_name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 最后一行特征，推理只使用这一行
    pub fn last_row(&self) -> Option<&[f64]> {
        self.rows.last().map(Vec::as_slice)
    }

    /// # Summary
    /// 以 CSV 写出特征表。
    ///
    /// # Logic
    /// 1. 表头为 `date`、全部特征列、(可选) 目标列。
    /// 2. 数值使用最短往返表示，重新读入后数值完全一致。
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), FeatureError> {
        let mut csv = csv::Writer::from_writer(writer);

        let mut header = Vec::with_capacity(self.columns.len() + 2);
        header.push(DATE_COLUMN.to_string());
        header.extend(self.columns.iter().cloned());
        if let Some(name) = &self.target_name {
            header.push(name.clone());
        }
        csv.write_record(&header)
            .map_err(|e| FeatureError::Format(e.to_string()))?;

        for (i, row) in self.rows.iter().enumerate() {
            let mut record = Vec::with_capacity(header.len());
            record.push(self.index[i].format(DATE_FORMAT).to_string());
            record.extend(row.iter().map(|v| v.to_string()));
            if let Some(target) = &self.target {
                record.push(target[i].to_string());
            }
            csv.write_record(&record)
                .map_err(|e| FeatureError::Format(e.to_string()))?;
        }
        csv.flush().map_err(|e| FeatureError::Io(e.to_string()))
    }

    /// # Summary
    /// 从 CSV 读取特征表。
    ///
    /// # Logic
    /// 1. 校验表头包含全部必需特征列与目标列，缺失时一次性列出全部缺失项。
    /// 2. 空单元格视为缺失，逐列先前向填充再后向填充。
    /// 3. 按 `features` 给定的顺序抽取列，忽略多余列。
    ///
    /// # Arguments
    /// * `reader`: CSV 数据源。
    /// * `features`: 必需的特征列 (决定输出顺序)。
    /// * `target`: 必需的目标列名。
    ///
    /// # Returns
    /// 成功返回特征表；某列全部为空时返回 `FeatureError::Format`。
    pub fn read_csv<R: Read>(
        reader: R,
        features: &[String],
        target: &str,
    ) -> Result<Self, FeatureError> {
        let mut csv = csv::Reader::from_reader(reader);
        let headers = csv
            .headers()
            .map_err(|e| FeatureError::Format(e.to_string()))?
            .clone();
        let position = |name: &str| headers.iter().position(|h| h == name);

        let mut missing: Vec<String> = features
            .iter()
            .filter(|f| position(f.as_str()).is_none())
            .cloned()
            .collect();
        if position(target).is_none() {
            missing.push(target.to_string());
        }
        if !missing.is_empty() {
            return Err(FeatureError::MissingColumns(missing));
        }
        let date_pos = position(DATE_COLUMN)
            .ok_or_else(|| FeatureError::Format(format!("missing {} column", DATE_COLUMN)))?;

        // 目标列放在最后一起做填充
        let selected: Vec<usize> = features
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(target))
            .filter_map(position)
            .collect();

        let mut index = Vec::new();
        let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); selected.len()];
        for (line, record) in csv.records().enumerate() {
            let record = record.map_err(|e| FeatureError::Format(e.to_string()))?;
            let raw_date = record.get(date_pos).unwrap_or_default();
            let date = NaiveDateTime::parse_from_str(raw_date.trim(), DATE_FORMAT)
                .map_err(|e| {
                    FeatureError::Format(format!("row {}: bad date {:?}: {}", line, raw_date, e))
                })?
                .and_utc();
            index.push(date);

            for (slot, &pos) in columns.iter_mut().zip(&selected) {
                let cell = record.get(pos).unwrap_or_default().trim();
                let value = if cell.is_empty() {
                    None
                } else {
                    let v = cell.parse::<f64>().map_err(|e| {
                        FeatureError::Format(format!(
                            "row {} column {}: {:?}: {}",
                            line,
                            headers.get(pos).unwrap_or_default(),
                            cell,
                            e
                        ))
                    })?;
                    v.is_finite().then_some(v)
                };
                slot.push(value);
            }
        }

        let mut filled = Vec::with_capacity(columns.len());
        for (column, &pos) in columns.iter_mut().zip(&selected) {
            fill_forward_backward(column);
            let values: Option<Vec<f64>> = column.iter().copied().collect();
            match values {
                Some(values) => filled.push(values),
                None => {
                    return Err(FeatureError::Format(format!(
                        "column {} has no values",
                        headers.get(pos).unwrap_or_default()
                    )));
                }
            }
        }

        let target_values = filled.pop().unwrap_or_default();
        let rows: Vec<Vec<f64>> = (0..index.len())
            .map(|i| filled.iter().map(|col| col[i]).collect())
            .collect();
        debug!("Loaded feature table with {} rows", rows.len());

        Self::new(
            features.to_vec(),
            index,
            rows,
            Some((target.to_string(), target_values)),
        )
    }
}

/// # Summary
/// 对单列执行前向填充，再对开头仍缺失的部分执行后向填充。
pub fn fill_forward_backward(column: &mut [Option<f64>]) {
    let mut last = None;
    for cell in column.iter_mut() {
        match cell {
            Some(v) => last = Some(*v),
            None => *cell = last,
        }
    }
    let mut next = None;
    for cell in column.iter_mut().rev() {
        match cell {
            Some(v) => next = Some(*v),
            None => *cell = next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn names() -> Vec<String> {
        vec!["a".to_string(), "b".to_string()]
    }

    #[test]
    fn test_fill_forward_then_backward() {
        let mut col = vec![None, Some(1.0), None, None, Some(4.0), None];
        fill_forward_backward(&mut col);
        assert_eq!(
            col,
            vec![Some(1.0), Some(1.0), Some(1.0), Some(1.0), Some(4.0), Some(4.0)]
        );

        let mut empty: Vec<Option<f64>> = vec![None, None];
        fill_forward_backward(&mut empty);
        assert_eq!(empty, vec![None, None]);
    }

    #[test]
    fn test_new_rejects_ragged_rows() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let err = FeatureTable::new(names(), vec![t0], vec![vec![1.0]], None).unwrap_err();
        assert!(matches!(err, FeatureError::DimensionMismatch { expected: 2, got: 1 }));
    }

    #[test]
    fn test_csv_reload_is_exact() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 1, 0).unwrap();
        let table = FeatureTable::new(
            names(),
            vec![t0, t1],
            vec![vec![0.1 + 0.2, 1e-17], vec![3.0, -2.5]],
            Some(("y".to_string(), vec![10.0, 1.0 / 3.0])),
        )
        .unwrap();

        let mut buf = Vec::new();
        table.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("date,a,b,y\n2026-01-01 00:00:00,"));

        let reloaded = FeatureTable::read_csv(buf.as_slice(), &names(), "y").unwrap();
        assert_eq!(reloaded, table);
    }

    #[test]
    fn test_read_fills_gaps_and_reorders_columns() {
        let csv = "date,extra,b,a,y\n\
                   2026-01-01 00:00:00,9,,1,5\n\
                   2026-01-01 00:01:00,9,2,,6\n\
                   2026-01-01 00:02:00,9,3,4,\n";
        let table = FeatureTable::read_csv(csv.as_bytes(), &names(), "y").unwrap();
        assert_eq!(table.columns(), names().as_slice());
        assert_eq!(
            table.rows(),
            &[vec![1.0, 2.0], vec![1.0, 2.0], vec![4.0, 3.0]]
        );
        assert_eq!(table.target(), Some(&[5.0, 6.0, 6.0][..]));
    }

    #[test]
    fn test_read_lists_all_missing_columns() {
        let csv = "date,a\n2026-01-01 00:00:00,1\n";
        let err = FeatureTable::read_csv(csv.as_bytes(), &names(), "y").unwrap_err();
        match err {
            FeatureError::MissingColumns(missing) => {
                assert_eq!(missing, vec!["b".to_string(), "y".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
