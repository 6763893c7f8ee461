//! # `yosoku-store` - 本地持久化
//!
//! 管理数据目录布局、特征表 CSV 以及模型/标准化器二进制产物。
//! 所有写入都先落到同目录临时文件，再重命名为目标文件。

pub mod artifact;
pub mod layout;
pub mod table;
