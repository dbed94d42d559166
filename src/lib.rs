//! # MRL Compare
//!
//! 比对中国国家标准与欧盟数据库中的农药最大残留限量（MRL）
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure / Clients）
//! - `infrastructure/` - 持有稀缺资源，只暴露能力
//! - `MrlStore` - 唯一的数据库连接持有者
//! - `PdfLoader` - 按页读取 PDF 正文和目录标题
//! - `clients/` - `LlmClient`（模型补全）和 `EuFeedClient`（EU 数据下载）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 与 I/O 无关的核心算法
//! - `section_chunker` / `name_normalizer` - 文档切分与农药名规范化
//! - `lenient_parser` - 容错解析模型输出的列表
//! - `value_extraction` / `pesticide_bridge` / `mrl_reconciler` - 提取、桥接、比对
//! - `eu_feed` / `report_writer` - EU 数据清洗、报告输出
//!
//! ### ③ 流程层（Workflow）
//! - `ComparisonFlow` - 关键词 → 提取 → 桥接 → 比对 → 报告
//! - `DocumentFlow` - 目录标题 → 正文 → 章节 → 入库
//! - `EuUpdateFlow` - 下载 → 分区 → 整体替换
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator::App` - 持有资源，按命令分派

pub mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{CompletionClient, LlmClient};
pub use config::{Config, Prompts};
pub use error::{AppError, AppResult};
pub use infrastructure::{MrlStore, PdfLoader};
pub use models::{BridgeMapping, ChineseRecord, ComparisonRow, EuropeanRecord, Mrl};
pub use orchestrator::App;
pub use workflow::{ComparisonFlow, DocumentFlow, EuUpdateFlow};
