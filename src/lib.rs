//! # Packt Claim - Packt 每日免费电子书自动领取工具
//!
//! 这是一个用于自动领取 Packt 免费学习电子书、并从已拥有书籍中挑选书目的 Rust 库。
//!
//! ## 功能模块
//!
//! - `api`: API地址配置与所有响应的数据结构定义
//! - `client`: HTTP客户端、验证码求解器、书籍目录和认领器
//! - `selection`: 将 `1, 3, 7, 14-32` 这类输入解析为书籍序号
//! - `error`: 错误类型
//!
//! ## 基本用法
//!
//! ```rust,no_run
//! use packt_claim::{
//!     AntiCaptchaSolver, BookCatalog, CatalogConfig, ClaimConfig, HttpClient, OfferClaimer,
//!     PacktEndpoints,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let endpoints = PacktEndpoints::default();
//!     let client = Arc::new(HttpClient::login(&endpoints, "me@example.com", "secret").await?);
//!     let catalog = BookCatalog::new(client.clone(), CatalogConfig::new(&endpoints));
//!
//!     let claimer = OfferClaimer::new(
//!         ClaimConfig::new(endpoints, "anticaptcha_key"),
//!         client,
//!         Arc::new(AntiCaptchaSolver::new()?),
//!         catalog,
//!     );
//!     let outcome = claimer.claim_product().await?;
//!     println!("{:?}", outcome);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## 解析书籍选择
//!
//! ```rust
//! use packt_claim::selection::{parse, Selection};
//!
//! let Ok(Selection::Books(result)) = parse("1, 3, 5-7", 10) else {
//!     panic!("输入无效");
//! };
//! assert_eq!(result.indices(), &[1, 3, 5, 6, 7]);
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod selection;

// 重新导出常用的类型和结构体，方便使用
pub use api::*;
pub use client::{
    AntiCaptchaSolver, ApiClient, ApiResponse, BookCatalog, CaptchaSolver, CatalogConfig,
    ClaimConfig, ClaimOutcome, ClaimedProduct, HttpClient, OfferClaimer,
};
pub use error::{ClaimError, SolveError};
pub use selection::{Selection, SelectionError, SelectionResult};
