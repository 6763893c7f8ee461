//! # `yosoku-model` - 线性回归模型
//!
//! 普通最小二乘回归的拟合与评估、成对产物的发布，以及基于实时窗口的单点预测。

pub mod metrics;
pub mod predictor;
pub mod regression;
pub mod trainer;
