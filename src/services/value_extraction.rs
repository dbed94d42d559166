//! 从章节全文中提取 (食品, 限量)
//!
//! 章节是非结构化文本，由模型按关键词挑出相关的食品和限量，再用宽松解析器读取。

use std::collections::HashSet;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

use crate::clients::CompletionClient;
use crate::config::Prompts;
use crate::error::AppResult;
use crate::models::{ChapterHit, ChineseRecord};
use crate::services::lenient_parser;
use crate::utils::truncate_text;

/// 从一个命中章节中提取记录
async fn extract_from_hit<L: CompletionClient>(
    llm: &L,
    prompts: &Prompts,
    hit: &ChapterHit,
) -> AppResult<Vec<ChineseRecord>> {
    // 章节全文最后替换，避免正文中恰好出现占位符
    let prompt = Prompts::render(
        &prompts.value_extraction,
        &[
            ("keyword", hit.keyword.as_str()),
            ("pesticide", hit.pesticide.as_str()),
            ("text", hit.text.as_str()),
        ],
    );
    debug!(
        "提取 {} (关键词 {}, 版本 {})，章节 {} 字符",
        hit.pesticide,
        hit.keyword,
        hit.version,
        hit.text.chars().count()
    );

    let raw = llm.complete(&prompt).await?;
    let rows = match lenient_parser::parse_rows(&raw) {
        Ok(rows) => rows,
        Err(failure) => {
            warn!(
                "⚠️ {} (关键词 {}): 无法解析模型提取结果，跳过该章节。原始输出: {} | {}",
                hit.pesticide,
                hit.keyword,
                truncate_text(&raw, 200),
                failure
            );
            return Ok(Vec::new());
        }
    };

    let mut records = Vec::with_capacity(rows.len());
    for fields in rows {
        let food = fields
            .first()
            .and_then(|f| f.as_text())
            .filter(|f| !f.is_empty());
        match (food, fields.get(1)) {
            (Some(food), Some(mrl)) => {
                records.push(ChineseRecord::new(&hit.pesticide, food, mrl.as_mrl()));
            }
            _ => warn!("⚠️ {}: 忽略格式错误的行 {:?}", hit.pesticide, fields),
        }
    }
    Ok(records)
}

/// 按关键词命中的章节提取中国限量记录
///
/// # 参数
/// - `hits`: 数据库中按关键词命中的章节
/// - `concurrency`: 同时进行的模型调用数量
///
/// # 返回
/// 按命中顺序排列的记录，不同关键词得到的相同记录只保留一条
pub async fn extract_relevant_values<L: CompletionClient>(
    llm: &L,
    prompts: &Prompts,
    hits: &[ChapterHit],
    concurrency: usize,
) -> AppResult<Vec<ChineseRecord>> {
    let per_hit: Vec<Vec<ChineseRecord>> = stream::iter(hits)
        .map(|hit| extract_from_hit(llm, prompts, hit))
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let mut seen = HashSet::new();
    let records: Vec<ChineseRecord> = per_hit
        .into_iter()
        .flatten()
        .filter(|r| seen.insert((r.pesticide.clone(), r.food.clone(), r.mrl.to_string())))
        .collect();

    info!("✓ 从 {} 个章节中提取到 {} 条中国限量记录", hits.len(), records.len());
    Ok(records)
}
