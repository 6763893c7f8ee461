//! # `yosoku-forecast` - 预测服务
//!
//! 应用服务层门面，编排“数据更新 + 训练”与“实时推理”两个用例。

pub mod service;
