use yosoku_core::common::num::count_to_f64;
use yosoku_core::forecast::port::EvaluationReport;
use yosoku_core::model::error::ModelError;

/// 平均绝对误差
pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let n = count_to_f64(y_true.len());
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / n
}

/// 均方根误差
pub fn root_mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let n = count_to_f64(y_true.len());
    let mse = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / n;
    mse.sqrt()
}

/// # Summary
/// 决定系数 R²。
///
/// # Logic
/// 1. `1 - SS_res / SS_tot`。
/// 2. 目标为常数 (`SS_tot == 0`) 时，完全拟合记 1.0，否则记 0.0。
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let n = count_to_f64(y_true.len());
    let mean = y_true.iter().sum::<f64>() / n;
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// # Summary
/// 计算一组预测的 MAE / RMSE / R²。
///
/// # Returns
/// 输入为空或长度不一致时返回 ModelError。
pub fn evaluate(y_true: &[f64], y_pred: &[f64]) -> Result<EvaluationReport, ModelError> {
    if y_true.is_empty() {
        return Err(ModelError::EmptyInput);
    }
    if y_true.len() != y_pred.len() {
        return Err(ModelError::DimensionMismatch {
            expected: y_true.len(),
            got: y_pred.len(),
        });
    }
    Ok(EvaluationReport {
        mae: mean_absolute_error(y_true, y_pred),
        rmse: root_mean_squared_error(y_true, y_pred),
        r2: r2_score(y_true, y_pred),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics() {
        let y = [1.0, 2.0, 3.0, 4.0];
        let p = [1.0, 2.0, 3.0, 6.0];
        let report = evaluate(&y, &p).unwrap();
        assert!((report.mae - 0.5).abs() < 1e-12);
        assert!((report.rmse - 1.0).abs() < 1e-12);
        // SS_tot = 5, SS_res = 4
        assert!((report.r2 - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_r2_constant_target() {
        assert_eq!(r2_score(&[2.0, 2.0], &[2.0, 2.0]), 1.0);
        assert_eq!(r2_score(&[2.0, 2.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_evaluate_rejects_empty() {
        assert!(matches!(evaluate(&[], &[]), Err(ModelError::EmptyInput)));
    }
}
