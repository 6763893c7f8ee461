//! # `yosoku-core` - 领域内核
//!
//! 定义预测流水线共享的实体、错误类型与端口 (Port) 契约，不包含任何 I/O 实现。

pub mod common;
pub mod config;

pub mod market {
    pub mod entity;
    pub mod error;
    pub mod port;
}

pub mod feature {
    pub mod error;
}

pub mod model {
    pub mod error;
}

pub mod store {
    pub mod error;
}

pub mod forecast {
    pub mod error;
    pub mod port;
}
