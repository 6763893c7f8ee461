//! # `yosoku-api` - HTTP API 网关
//!
//! 预测服务的 HTTP 入口。
//! 使用 `axum` 构建路由，通过 `utoipa` 自动生成 OpenAPI 3.0 Swagger 文档。
//!
//! ## 架构职责
//! - `GET /inference/{token}`：返回一次纯文本价格预测
//! - `GET /update`：触发数据更新与重新训练，返回 `0` / `1`
//! - 只依赖 `yosoku-core` 中的 `ForecastService` 契约

pub mod error;
pub mod server;
pub mod types;

pub mod routes {
    pub mod inference;
    pub mod update;
}
