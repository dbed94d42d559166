//! 应用 - 编排层
//!
//! 持有配置、数据库和模型客户端，按命令分派到对应的流程。

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::Command;
use crate::clients::{EuFeedClient, LlmClient};
use crate::config::Config;
use crate::infrastructure::MrlStore;
use crate::services::ReportWriter;
use crate::utils::logging::log_startup;
use crate::workflow::{ComparisonFlow, DocumentFlow, DocumentUpload, EuUpdateFlow};

/// 应用主结构
pub struct App {
    config: Config,
    store: MrlStore,
    llm: LlmClient,
}

impl App {
    /// 初始化应用：打开数据库，创建模型客户端
    pub fn initialize(config: Config) -> Result<Self> {
        let store = MrlStore::open(&config.database_path)
            .with_context(|| format!("无法打开数据库: {}", config.database_path))?;
        let llm = LlmClient::new(&config);
        Ok(Self { config, store, llm })
    }

    /// 执行一个命令
    pub async fn run(&mut self, command: Command) -> Result<()> {
        log_startup(
            command.name(),
            self.llm.model_name(),
            self.config.max_concurrent_llm_calls,
        );

        match command {
            Command::Comp(args) => {
                let writer = ReportWriter::with_path(args.output_path);
                let rows = ComparisonFlow::new(&self.config)
                    .run(&self.store, &self.llm, &args.keywords, &writer)
                    .await?;
                info!("✅ 比对完成，共 {} 行", rows.len());
            }
            Command::Doc(args) => {
                let upload = DocumentUpload::from(args);
                DocumentFlow::new().run(&mut self.store, &upload)?;
            }
            Command::Eu => {
                let feed = EuFeedClient::new(&self.config)?;
                EuUpdateFlow::new(feed).run(&mut self.store).await?;
            }
        }

        let (chapters, applicable, not_yet) = self.store.counts()?;
        info!(
            "🗄️ 数据库: {} 个章节，EU 生效 {} 条，尚未生效 {} 条",
            chapters, applicable, not_yet
        );
        Ok(())
    }
}
