//! 文档上传流程 - 流程层
//!
//! 目录页取标题 → 正文页取文本 → 按标题切分章节 → 追加写入数据库

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::infrastructure::{MrlStore, PdfLoader};
use crate::services::section_chunker;
use crate::utils::logging::log_stage;

const TOTAL_STAGES: usize = 3;

/// 一份待上传的中国标准文档
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub path: PathBuf,
    /// 写入每个章节的版本号
    pub version: String,
    /// 目录页范围（从 1 开始，包含两端）
    pub outline_pages: (u32, u32),
    /// 正文页范围（从 1 开始，包含两端）
    pub table_pages: (u32, u32),
    /// 标题所在章节号，例如 4 对应 `4.15 Zoxamide (苯酰菌胺)`
    pub chapter_number: u32,
}

/// 文档上传流程
pub struct DocumentFlow {
    loader: PdfLoader,
}

impl DocumentFlow {
    pub fn new() -> Self {
        Self {
            loader: PdfLoader::new(),
        }
    }

    /// 切分文档并写入数据库
    ///
    /// # 返回
    /// 写入的章节数
    pub fn run(&self, store: &mut MrlStore, upload: &DocumentUpload) -> Result<usize> {
        info!("📄 上传文档: {} (版本 {})", upload.path.display(), upload.version);

        log_stage(1, TOTAL_STAGES, "读取目录标题");
        let (first, last) = upload.outline_pages;
        let headings = self
            .loader
            .load_outline_headings(&upload.path, first, last, upload.chapter_number)
            .context("读取目录失败")?;
        if headings.is_empty() {
            warn!(
                "⚠️ 目录页 {}-{} 中没有第 {} 章的标题，不写入任何章节",
                first, last, upload.chapter_number
            );
            return Ok(0);
        }

        log_stage(2, TOTAL_STAGES, "读取正文并切分");
        let (first, last) = upload.table_pages;
        let text = self
            .loader
            .load_text(&upload.path, first, last)
            .context("读取正文失败")?;
        let chapters = section_chunker::chunk(&text, &headings, &upload.version)
            .context("切分章节失败")?;
        if chapters.len() < headings.len() {
            warn!(
                "⚠️ {} 个标题中只有 {} 个在正文中找到",
                headings.len(),
                chapters.len()
            );
        }

        log_stage(3, TOTAL_STAGES, "写入数据库");
        let written = store
            .insert_chinese_records(&chapters)
            .context("写入章节失败")?;
        info!("✅ 文档上传完成: {} 个章节", written);
        Ok(written)
    }
}

impl Default for DocumentFlow {
    fn default() -> Self {
        Self::new()
    }
}
