//! 编排层（Orchestration Layer）
//!
//! 只做资源管理和命令分派，不做具体业务判断。
//!
//! ```text
//! orchestrator::App (持有 Config / MrlStore / LlmClient)
//!     ↓
//! workflow (ComparisonFlow / DocumentFlow / EuUpdateFlow)
//!     ↓
//! services (切分 / 桥接 / 比对 / 报告)
//!     ↓
//! clients + infrastructure (模型、EU 数据源、SQLite、PDF)
//! ```

pub mod app;

pub use app::App;
