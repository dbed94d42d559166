//! 比对流程 - 流程层
//!
//! 流程顺序：
//! 1. 按关键词查询章节
//! 2. 模型提取 (食品, 限量)
//! 3. 中国农药名桥接到 EU 农药名
//! 4. 读取 EU 生效记录
//! 5. 逐项比对并判定有效限量
//! 6. 写报告

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::clients::CompletionClient;
use crate::config::{Config, Prompts};
use crate::error::{AppError, InputError};
use crate::infrastructure::MrlStore;
use crate::models::{ChineseRecord, ComparisonRow};
use crate::services::{mrl_reconciler, pesticide_bridge, value_extraction, ReportWriter};
use crate::utils::logging::{log_stage, print_comparison_stats};

const TOTAL_STAGES: usize = 6;

/// 比对流程
///
/// 不持有数据库和模型客户端，由调用方传入。
pub struct ComparisonFlow {
    prompts: Prompts,
    similarity_threshold: f64,
    default_mrl: f64,
    concurrency: usize,
}

impl ComparisonFlow {
    pub fn new(config: &Config) -> Self {
        Self {
            prompts: config.prompts.clone(),
            similarity_threshold: config.similarity_threshold,
            default_mrl: config.default_mrl,
            concurrency: config.max_concurrent_llm_calls,
        }
    }

    /// 执行一次比对并写报告
    ///
    /// # 参数
    /// - `keywords`: 农药名或食品名关键词，空白关键词会被忽略
    /// - `writer`: 报告输出位置
    ///
    /// # 返回
    /// 写入报告的全部行；没有命中任何中国记录时为空
    pub async fn run<L: CompletionClient>(
        &self,
        store: &MrlStore,
        llm: &L,
        keywords: &[String],
        writer: &ReportWriter,
    ) -> Result<Vec<ComparisonRow>> {
        let keywords = clean_keywords(keywords)?;

        log_stage(1, TOTAL_STAGES, "查询章节");
        let hits = store
            .query_chinese_by_keywords(&keywords)
            .context("查询章节失败")?;
        info!("✓ 关键词 {:?} 命中 {} 个章节", keywords, hits.len());
        if hits.is_empty() {
            return self.finish_empty(&keywords, writer).await;
        }

        log_stage(2, TOTAL_STAGES, "提取中国限量");
        let chinese =
            value_extraction::extract_relevant_values(llm, &self.prompts, &hits, self.concurrency)
                .await
                .context("提取中国限量失败")?;
        if chinese.is_empty() {
            return self.finish_empty(&keywords, writer).await;
        }

        log_stage(3, TOTAL_STAGES, "匹配 EU 农药");
        let names = distinct_pesticides(&chinese);
        let catalog = store
            .list_all_eu_pesticide_names()
            .context("读取 EU 农药目录失败")?;
        if catalog.is_empty() {
            warn!("⚠️ 数据库中没有 EU 数据，请先运行 eu 命令更新");
        }
        let bridge = pesticide_bridge::bridge(
            llm,
            &self.prompts,
            &names,
            &catalog,
            self.similarity_threshold,
            self.concurrency,
        )
        .await
        .context("匹配 EU 农药失败")?;

        log_stage(4, TOTAL_STAGES, "读取 EU 限量");
        let european_names = bridge.european_names();
        let european = store
            .get_eu_records_for(european_names.iter().map(String::as_str))
            .context("读取 EU 限量失败")?;
        info!(
            "✓ {} 个 EU 农药中有 {} 个存在生效记录",
            european_names.len(),
            european.len()
        );

        log_stage(5, TOTAL_STAGES, "逐项比对");
        let rows = mrl_reconciler::reconcile(
            llm,
            &self.prompts,
            &chinese,
            &european,
            &bridge,
            self.default_mrl,
            self.concurrency,
        )
        .await
        .context("比对失败")?;

        log_stage(6, TOTAL_STAGES, "写入报告");
        writer.write(&keywords, &rows).await?;

        let unmatched = names
            .iter()
            .filter(|name| bridge.matches(name).next().is_none())
            .count();
        print_comparison_stats(
            names.len(),
            rows.len(),
            unmatched,
            &writer.path().display().to_string(),
        );
        Ok(rows)
    }

    async fn finish_empty(
        &self,
        keywords: &[String],
        writer: &ReportWriter,
    ) -> Result<Vec<ComparisonRow>> {
        warn!("⚠️ 关键词 {:?} 没有找到任何中国限量记录，输出空报告", keywords);
        writer.write(keywords, &[]).await?;
        Ok(Vec::new())
    }
}

/// 去掉空白关键词，全部为空时拒绝
fn clean_keywords(keywords: &[String]) -> Result<Vec<String>, AppError> {
    let cleaned: Vec<String> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect();
    if cleaned.is_empty() {
        return Err(InputError::NoKeywords.into());
    }
    Ok(cleaned)
}

/// 中国农药名，按首次出现顺序去重
fn distinct_pesticides(records: &[ChineseRecord]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for record in records {
        if !names.contains(&record.pesticide) {
            names.push(record.pesticide.clone());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Mrl;

    #[test]
    fn test_blank_keywords_rejected() {
        let result = clean_keywords(&["  ".to_string(), String::new()]);
        assert!(matches!(result, Err(AppError::Input(InputError::NoKeywords))));
        assert_eq!(
            clean_keywords(&[" wheat ".to_string(), "".to_string()]).unwrap(),
            vec!["wheat"]
        );
    }

    #[test]
    fn test_distinct_pesticides_keep_first_appearance() {
        let records = vec![
            ChineseRecord::new("B", "wheat", Mrl::new(0.1)),
            ChineseRecord::new("A", "rice", Mrl::new(0.1)),
            ChineseRecord::new("B", "rice", Mrl::new(0.2)),
        ];
        assert_eq!(distinct_pesticides(&records), vec!["B", "A"]);
    }
}
