use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;
use yosoku_core::common::num::count_to_f64;
use yosoku_core::model::error::ModelError;

/// # Summary
/// 带截距的普通最小二乘线性回归。
///
/// # Invariants
/// - `coefficients.len()` 等于训练时的特征数。
/// - 设计矩阵秩亏时取最小范数解，结果仍然确定。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

fn column_means(x: &[Vec<f64>], width: usize) -> Vec<f64> {
    let n = count_to_f64(x.len());
    let mut means = vec![0.0; width];
    for row in x {
        for (m, v) in means.iter_mut().zip(row) {
            *m += v;
        }
    }
    means.iter_mut().for_each(|m| *m /= n);
    means
}

impl LinearRegression {
    /// # Summary
    /// 拟合模型。
    ///
    /// # Logic
    /// 1. 对特征与目标去中心化，截距由均值恢复。
    /// 2. 对中心化后的设计矩阵做 SVD，以 `max(σ) * max(n, p) * ε` 为阈值截断奇异值，
    ///    求最小范数最小二乘解。
    /// 3. `intercept = mean(y) - Σ coef_j * mean(x_j)`。
    ///
    /// # Arguments
    /// * `x`: 行优先特征矩阵。
    /// * `y`: 目标值，与 `x` 行数一致。
    ///
    /// # Returns
    /// 成功返回拟合后的模型。
    pub fn fit(x: &[Vec<f64>], y: &[f64]) -> Result<Self, ModelError> {
        let n = x.len();
        if n == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        if y.len() != n {
            return Err(ModelError::DimensionMismatch {
                expected: n,
                got: y.len(),
            });
        }
        let p = x[0].len();
        if let Some(bad) = x.iter().find(|row| row.len() != p) {
            return Err(ModelError::DimensionMismatch {
                expected: p,
                got: bad.len(),
            });
        }

        let y_mean = y.iter().sum::<f64>() / count_to_f64(n);
        if p == 0 {
            return Ok(Self {
                coefficients: Vec::new(),
                intercept: y_mean,
            });
        }

        let x_mean = column_means(x, p);
        let design = DMatrix::from_fn(n, p, |i, j| x[i][j] - x_mean[j]);
        let centered_y = DVector::from_fn(n, |i, _| y[i] - y_mean);

        let svd = design.svd(true, true);
        let max_sv = svd.singular_values.max();
        let eps = max_sv * count_to_f64(n.max(p)) * f64::EPSILON;
        let beta = svd
            .solve(&centered_y, eps)
            .map_err(|e| ModelError::Solver(e.to_string()))?;

        let coefficients: Vec<f64> = beta.iter().copied().collect();
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::Solver("non-finite coefficient".to_string()));
        }
        let intercept = y_mean
            - coefficients
                .iter()
                .zip(&x_mean)
                .map(|(c, m)| c * m)
                .sum::<f64>();
        let rank = svd.singular_values.iter().filter(|s| **s > eps).count();
        debug!("Fitted OLS on {}x{} design, rank {}", n, p, rank);

        Ok(Self {
            coefficients,
            intercept,
        })
    }

    pub fn width(&self) -> usize {
        self.coefficients.len()
    }

    /// 预测单行
    pub fn predict_row(&self, row: &[f64]) -> Result<f64, ModelError> {
        if row.len() != self.width() {
            return Err(ModelError::DimensionMismatch {
                expected: self.width(),
                got: row.len(),
            });
        }
        Ok(self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, v)| c * v)
                .sum::<f64>())
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovers_exact_linear_relation() {
        let x: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![i as f64, ((i * 7) % 5) as f64])
            .collect();
        let y: Vec<f64> = x.iter().map(|r| 3.0 + 2.0 * r[0] - 0.5 * r[1]).collect();

        let model = LinearRegression::fit(&x, &y).unwrap();
        assert!((model.intercept - 3.0).abs() < 1e-9);
        assert!((model.coefficients[0] - 2.0).abs() < 1e-9);
        assert!((model.coefficients[1] + 0.5).abs() < 1e-9);
        assert!((model.predict_row(&[10.0, 1.0]).unwrap() - 22.5).abs() < 1e-9);
    }

    #[test]
    fn test_collinear_columns_get_minimum_norm_solution() {
        // 第二列与第一列完全相同
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| 1.0 + 4.0 * i as f64).collect();

        let model = LinearRegression::fit(&x, &y).unwrap();
        assert!((model.coefficients[0] - 2.0).abs() < 1e-9);
        assert!((model.coefficients[1] - 2.0).abs() < 1e-9);
        assert!((model.intercept - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_feature_gets_zero_weight() {
        let x: Vec<Vec<f64>> = (0..5).map(|_| vec![0.0]).collect();
        let y = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let model = LinearRegression::fit(&x, &y).unwrap();
        assert_eq!(model.coefficients, vec![0.0]);
        assert!((model.intercept - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(matches!(
            LinearRegression::fit(&[], &[]),
            Err(ModelError::EmptyTrainingSet)
        ));
        assert!(matches!(
            LinearRegression::fit(&[vec![1.0]], &[1.0, 2.0]),
            Err(ModelError::DimensionMismatch { .. })
        ));
        let model = LinearRegression {
            coefficients: vec![1.0, 2.0],
            intercept: 0.0,
        };
        assert!(model.predict_row(&[1.0]).is_err());
    }
}
