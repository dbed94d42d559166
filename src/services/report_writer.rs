//! 报告写入服务
//!
//! 只负责把比对结果写成 JSON 文件，不关心结果如何产生

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::models::ComparisonRow;

/// 默认输出文件
pub const DEFAULT_OUTPUT_PATH: &str = "output.json";

/// 写入文件的报告结构
#[derive(Debug, Serialize)]
pub struct ComparisonReport<'a> {
    /// 生成时间（本地时间，RFC 3339）
    pub generated_at: String,
    pub keywords: &'a [String],
    pub row_count: usize,
    pub rows: &'a [ComparisonRow],
}

/// 报告写入服务
pub struct ReportWriter {
    output_path: PathBuf,
}

impl ReportWriter {
    /// 写到默认路径 `output.json`
    pub fn new() -> Self {
        Self::with_path(DEFAULT_OUTPUT_PATH)
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.output_path
    }

    /// 写入报告，已存在的文件会被覆盖
    ///
    /// # 参数
    /// - `keywords`: 本次比对的关键词
    /// - `rows`: 比对结果
    pub async fn write(&self, keywords: &[String], rows: &[ComparisonRow]) -> Result<()> {
        let report = ComparisonReport {
            generated_at: chrono::Local::now().to_rfc3339(),
            keywords,
            row_count: rows.len(),
            rows,
        };
        let json = serde_json::to_string_pretty(&report).context("序列化报告失败")?;
        debug!("报告大小: {} 字节", json.len());

        if let Some(parent) = self.output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("无法创建目录: {}", parent.display()))?;
        }
        tokio::fs::write(&self.output_path, json)
            .await
            .with_context(|| format!("无法写入报告: {}", self.output_path.display()))?;

        info!("✓ 报告已写入 {} ({} 行)", self.output_path.display(), rows.len());
        Ok(())
    }
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self::new()
    }
}
