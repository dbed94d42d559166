//! 中国农药名 → EU 农药名
//!
//! 两个阶段：
//! 1. 本地模糊预筛选：按空白分词，逐对比较词的相似度，保留包含相近词的 EU 名称
//! 2. 把候选交给模型做最终判断，解析模型返回的字符串列表
//!
//! 预筛选只是为了控制提示词长度，命名完全不同的同一种农药会在这一步漏掉。

use std::collections::{BTreeSet, HashSet};

use futures::stream::{self, StreamExt, TryStreamExt};
use phf::phf_set;
use tracing::{debug, info, warn};

use crate::clients::CompletionClient;
use crate::config::Prompts;
use crate::error::AppResult;
use crate::models::BridgeMapping;
use crate::services::lenient_parser;
use crate::utils::truncate_text;

/// 预筛选相似度阈值（0..1，即 50/100）
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.5;

/// EU 名称中不参与比较的常见英文词
pub static STOP_WORDS: phf::Set<&'static str> = phf_set! {
    "and", "its", "as", "of", "sum", "expressed", "including", "other",
};

/// 模糊预筛选
///
/// # 参数
/// - `chinese`: 中国农药名
/// - `catalog`: 全部 EU 农药名
/// - `threshold`: 相似度阈值（0..1），达到即入选
///
/// # 返回
/// 入选的 EU 名称，按目录顺序，去重
pub fn prefilter(chinese: &str, catalog: &[String], threshold: f64) -> Vec<String> {
    let chinese_tokens: Vec<String> = chinese.split_whitespace().map(str::to_lowercase).collect();
    let mut seen = HashSet::new();

    catalog
        .iter()
        .filter(|entry| {
            entry
                .split_whitespace()
                .map(str::to_lowercase)
                .filter(|token| !STOP_WORDS.contains(token.as_str()))
                .any(|eu_token| {
                    chinese_tokens.iter().any(|chi_token| {
                        rapidfuzz::fuzz::ratio(chi_token.chars(), eu_token.chars()) >= threshold
                    })
                })
        })
        .filter(|entry| seen.insert(entry.as_str()))
        .cloned()
        .collect()
}

/// 把候选列表写成提示词中的列表字面量
fn format_candidates(candidates: &[String]) -> String {
    let quoted: Vec<String> = candidates
        .iter()
        .map(|c| format!("\"{}\"", c.replace('"', "\\\"")))
        .collect();
    format!("[{}]", quoted.join(", "))
}

/// 为一个中国农药名找出对应的 EU 名称
///
/// 模型输出无法解析时记录警告并返回空集合；只保留目录中真实存在的名称。
async fn bridge_one<L: CompletionClient>(
    llm: &L,
    prompts: &Prompts,
    chinese: &str,
    catalog: &[String],
    threshold: f64,
) -> AppResult<BTreeSet<String>> {
    let candidates = prefilter(chinese, catalog, threshold);
    if candidates.is_empty() {
        info!("🔗 {}: 没有相近的 EU 名称", chinese);
        return Ok(BTreeSet::new());
    }
    debug!("{}: 预筛选得到 {} 个候选", chinese, candidates.len());

    let candidate_list = format_candidates(&candidates);
    let prompt = Prompts::render(
        &prompts.compare_pesticides,
        &[
            ("chinese_pesticide", chinese),
            ("european_pesticides", candidate_list.as_str()),
        ],
    );
    let raw = llm.complete(&prompt).await?;

    let names = match lenient_parser::parse_string_list(&raw) {
        Ok(names) => names,
        Err(failure) => {
            warn!(
                "⚠️ {}: 无法解析模型返回的名称列表，按无匹配处理。原始输出: {} | {}",
                chinese,
                truncate_text(&raw, 200),
                failure
            );
            return Ok(BTreeSet::new());
        }
    };

    let known: HashSet<&str> = catalog.iter().map(String::as_str).collect();
    let (accepted, unknown): (Vec<String>, Vec<String>) =
        names.into_iter().partition(|n| known.contains(n.as_str()));
    if !unknown.is_empty() {
        warn!("⚠️ {}: 模型返回了目录中不存在的名称，已忽略: {:?}", chinese, unknown);
    }

    info!("🔗 {}: {} 个候选 → {} 个匹配", chinese, candidates.len(), accepted.len());
    Ok(accepted.into_iter().collect())
}

/// 建立桥接映射
///
/// 每个输入名称都会出现在结果中，没有匹配时为空集合。各名称相互独立，
/// 最多 `concurrency` 个同时进行，结果按输入顺序合并。
///
/// # 错误
/// 只有模型调用本身失败（重试用尽）时返回错误。
pub async fn bridge<L: CompletionClient>(
    llm: &L,
    prompts: &Prompts,
    chinese_names: &[String],
    catalog: &[String],
    threshold: f64,
    concurrency: usize,
) -> AppResult<BridgeMapping> {
    let mut seen = HashSet::new();
    let unique: Vec<&String> = chinese_names
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .collect();

    let results: Vec<(&String, BTreeSet<String>)> = stream::iter(unique)
        .map(|name| async move {
            bridge_one(llm, prompts, name, catalog, threshold)
                .await
                .map(|matches| (name, matches))
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let mut mapping = BridgeMapping::new();
    for (name, matches) in results {
        mapping.insert(name.as_str(), matches);
    }
    Ok(mapping)
}
