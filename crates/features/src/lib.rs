//! # `yosoku-features` - 特征工程
//!
//! 将两个资产表对齐为宽表，构造固定的 80 列特征 (训练时附加目标列)，
//! 并提供按时间顺序切分与标准化。

pub mod builder;
pub mod dataset;
pub mod frame;
pub mod table;
