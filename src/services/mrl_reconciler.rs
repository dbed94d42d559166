//! 中国与 EU 限量的逐项比对
//!
//! 分两个阶段：
//! 1. 生成行：每个中国农药按桥接结果与每个 EU 农药配对，由模型把两边的食品对齐
//! 2. 统一判定有效限量：对全部行按固定决策表计算 `valid_mrl`，并规范备注
//!
//! 决策表（按顺序，第一条命中生效）：
//!
//! | 中国限量 | EU 限量 | 有效限量 | 备注 |
//! |---|---|---|---|
//! | 缺失 | 缺失 | 缺失 | 不变 |
//! | 缺失 | 有 | EU 限量 | 不变 |
//! | 有 | 缺失，且桥接到了真实的 EU 农药 | 默认值 | 默认值说明 |
//! | 有 | 有 | 两者较小值 | 不变 |

use std::collections::{BTreeMap, HashMap, HashSet};

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

use crate::clients::CompletionClient;
use crate::config::Prompts;
use crate::error::AppResult;
use crate::models::{BridgeMapping, ChineseRecord, ComparisonRow, EuropeanRecord, Mrl, MISSING_MARKER};
use crate::services::lenient_parser::{self, Literal};
use crate::utils::truncate_text;

/// 只有中国限量时使用的默认有效限量（mg/kg）
pub const DEFAULT_FALLBACK_MRL: f64 = 0.01;

/// 没有对应 EU 农药时的备注
pub const NO_MATCH_NOTE: &str = "No fitting eu-pesticide found.";

/// 桥接到的 EU 农药没有生效记录时的备注
pub const NO_EU_VALUES_NOTE: &str = "No applicable EU values for this pesticide.";

/// 使用默认值时的备注
pub fn default_note(default_mrl: f64) -> String {
    format!("Defaults to {}, no value in EU. Check again.", default_mrl)
}

/// 生成行并判定有效限量
///
/// # 参数
/// - `chinese`: 中国限量记录
/// - `european`: EU 农药名 → 生效记录
/// - `bridge`: 桥接映射
/// - `default_mrl`: 只有中国限量时的默认值
/// - `concurrency`: 同时处理的中国农药数量
pub async fn reconcile<L: CompletionClient>(
    llm: &L,
    prompts: &Prompts,
    chinese: &[ChineseRecord],
    european: &BTreeMap<String, Vec<EuropeanRecord>>,
    bridge: &BridgeMapping,
    default_mrl: f64,
    concurrency: usize,
) -> AppResult<Vec<ComparisonRow>> {
    let rows = build_rows(llm, prompts, chinese, european, bridge, concurrency).await?;
    Ok(resolve(rows, default_mrl))
}

/// 阶段 1：生成比对行
///
/// 中国农药按首次出现的顺序处理，结果顺序与并发数无关。
pub async fn build_rows<L: CompletionClient>(
    llm: &L,
    prompts: &Prompts,
    chinese: &[ChineseRecord],
    european: &BTreeMap<String, Vec<EuropeanRecord>>,
    bridge: &BridgeMapping,
    concurrency: usize,
) -> AppResult<Vec<ComparisonRow>> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_pesticide: HashMap<&str, Vec<&ChineseRecord>> = HashMap::new();
    for record in chinese {
        let entry = by_pesticide.entry(record.pesticide.as_str()).or_insert_with(|| {
            order.push(record.pesticide.as_str());
            Vec::new()
        });
        entry.push(record);
    }

    let per_pesticide: Vec<Vec<ComparisonRow>> = stream::iter(order)
        .map(|pesticide| {
            let records = by_pesticide.get(pesticide).cloned().unwrap_or_default();
            async move { rows_for_pesticide(llm, prompts, pesticide, &records, european, bridge).await }
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let rows: Vec<ComparisonRow> = per_pesticide.into_iter().flatten().collect();
    info!("✓ 生成比对行 {} 条", rows.len());
    Ok(rows)
}

async fn rows_for_pesticide<L: CompletionClient>(
    llm: &L,
    prompts: &Prompts,
    pesticide: &str,
    records: &[&ChineseRecord],
    european: &BTreeMap<String, Vec<EuropeanRecord>>,
    bridge: &BridgeMapping,
) -> AppResult<Vec<ComparisonRow>> {
    let eu_names: Vec<&String> = bridge.matches(pesticide).collect();
    if eu_names.is_empty() {
        info!("❓ {}: 没有对应的 EU 农药", pesticide);
        return Ok(vec![no_match_row(pesticide)]);
    }

    let mut rows = Vec::new();
    for eu_name in eu_names {
        let eu_records = european.get(eu_name.as_str()).map(Vec::as_slice).unwrap_or(&[]);
        if eu_records.is_empty() {
            warn!("⚠️ {} → {}: EU 中没有生效的限量记录", pesticide, eu_name);
            rows.extend(records.iter().map(|r| missing_eu_row(r, eu_name)));
            continue;
        }

        if let Some(aligned) = align_pair(llm, prompts, pesticide, eu_name, records, eu_records).await? {
            debug!("{} → {}: 对齐 {} 行", pesticide, eu_name, aligned.len());
            rows.extend(aligned);
        }
    }
    Ok(rows)
}

fn no_match_row(pesticide: &str) -> ComparisonRow {
    ComparisonRow {
        chi_pesticide: pesticide.to_string(),
        eu_pesticide: MISSING_MARKER.to_string(),
        chi_food: MISSING_MARKER.to_string(),
        eu_food: MISSING_MARKER.to_string(),
        chi_mrl: Mrl::MISSING,
        eu_mrl: Mrl::MISSING,
        note: NO_MATCH_NOTE.to_string(),
        valid_mrl: Mrl::MISSING,
    }
}

fn missing_eu_row(record: &ChineseRecord, eu_name: &str) -> ComparisonRow {
    ComparisonRow {
        chi_pesticide: record.pesticide.clone(),
        eu_pesticide: eu_name.to_string(),
        chi_food: record.food.clone(),
        eu_food: MISSING_MARKER.to_string(),
        chi_mrl: record.mrl,
        eu_mrl: Mrl::MISSING,
        note: NO_EU_VALUES_NOTE.to_string(),
        valid_mrl: Mrl::MISSING,
    }
}

/// 把 (食品, 限量) 写成两列 CSV
fn to_csv<'a>(pairs: impl Iterator<Item = (&'a str, Mrl)>) -> String {
    let mut csv = String::from("food,mrl\n");
    for (food, mrl) in pairs {
        if food.contains(&[',', '"', '\n'][..]) {
            csv.push_str(&format!("\"{}\",{}\n", food.replace('"', "\"\""), mrl));
        } else {
            csv.push_str(&format!("{},{}\n", food, mrl));
        }
    }
    csv
}

/// 让模型对齐一对农药的食品
///
/// 模型输出无法解析时记录警告并返回 `None`，这一对不产生任何行。
async fn align_pair<L: CompletionClient>(
    llm: &L,
    prompts: &Prompts,
    pesticide: &str,
    eu_name: &str,
    chinese: &[&ChineseRecord],
    european: &[EuropeanRecord],
) -> AppResult<Option<Vec<ComparisonRow>>> {
    let chinese_csv = to_csv(chinese.iter().map(|r| (r.food.as_str(), r.mrl)));
    let european_csv = to_csv(
        european
            .iter()
            .map(|r| (r.product_name.as_str(), r.mrl_value_only)),
    );
    let prompt = Prompts::render(
        &prompts.compare_values,
        &[
            ("chinese", chinese_csv.as_str()),
            ("european", european_csv.as_str()),
        ],
    );

    let raw = llm.complete(&prompt).await?;
    let parsed = match lenient_parser::parse_rows(&raw) {
        Ok(parsed) => parsed,
        Err(failure) => {
            warn!(
                "⚠️ {} → {}: 无法解析模型的对齐结果，跳过这一对。原始输出: {} | {}",
                pesticide,
                eu_name,
                truncate_text(&raw, 200),
                failure
            );
            return Ok(None);
        }
    };

    // 数值以记录为准，模型只负责配对
    let chi_values = unambiguous_values(chinese.iter().map(|r| (r.food.as_str(), r.mrl)));
    let eu_values = unambiguous_values(
        european
            .iter()
            .map(|r| (r.product_name.as_str(), r.mrl_value_only)),
    );

    let mut rows = Vec::with_capacity(parsed.len());
    for fields in parsed {
        if fields.len() < 4 {
            warn!(
                "⚠️ {} → {}: 忽略字段不足的行 {:?}",
                pesticide, eu_name, fields
            );
            continue;
        }
        let chi_food = text_or_marker(&fields[0]);
        let eu_food = text_or_marker(&fields[1]);
        let chi_mrl = chi_values
            .get(chi_food.as_str())
            .copied()
            .unwrap_or_else(|| fields[2].as_mrl());
        let eu_mrl = eu_values
            .get(eu_food.as_str())
            .copied()
            .unwrap_or_else(|| fields[3].as_mrl());
        let note = fields.get(4).and_then(Literal::as_text).unwrap_or_default();

        rows.push(ComparisonRow {
            chi_pesticide: pesticide.to_string(),
            eu_pesticide: eu_name.to_string(),
            chi_food,
            eu_food,
            chi_mrl,
            eu_mrl,
            note,
            valid_mrl: Mrl::MISSING,
        });
    }
    Ok(Some(rows))
}

/// 食品 → 限量，只保留限量唯一的食品
///
/// 同一食品有多个不同限量时（多个版本、重复条目）无法确定对应哪一行，沿用模型给出的数值。
fn unambiguous_values<'a>(pairs: impl Iterator<Item = (&'a str, Mrl)>) -> HashMap<&'a str, Mrl> {
    let mut values: HashMap<&'a str, Option<Mrl>> = HashMap::new();
    for (food, mrl) in pairs {
        values
            .entry(food)
            .and_modify(|known| {
                if *known != Some(mrl) {
                    *known = None;
                }
            })
            .or_insert(Some(mrl));
    }
    values
        .into_iter()
        .filter_map(|(food, mrl)| mrl.map(|m| (food, m)))
        .collect()
}

fn text_or_marker(field: &Literal) -> String {
    field
        .as_text()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| MISSING_MARKER.to_string())
}

/// 阶段 2：对全部行判定有效限量并规范备注
///
/// 对同一输入重复执行结果不变。
pub fn resolve(rows: Vec<ComparisonRow>, default_mrl: f64) -> Vec<ComparisonRow> {
    let mut defaulted = HashSet::new();
    let resolved: Vec<ComparisonRow> = rows
        .into_iter()
        .map(|row| {
            let bridged = row.eu_pesticide != MISSING_MARKER;
            let (valid_mrl, note) = match (row.chi_mrl.value(), row.eu_mrl.value()) {
                (None, None) => (Mrl::MISSING, row.note),
                (None, Some(eu)) => (Mrl::new(eu), row.note),
                (Some(_), None) if bridged => {
                    defaulted.insert(row.chi_pesticide.clone());
                    (Mrl::new(default_mrl), default_note(default_mrl))
                }
                (Some(_), None) => (Mrl::MISSING, row.note),
                (Some(_), Some(_)) => (row.chi_mrl.stricter(row.eu_mrl), row.note),
            };
            ComparisonRow {
                valid_mrl,
                note: with_period(note),
                ..row
            }
        })
        .collect();

    if !defaulted.is_empty() {
        info!("ℹ️ {} 个农药存在使用默认限量 {} 的行", defaulted.len(), default_mrl);
    }
    resolved
}

/// 备注以句号结尾，空备注记为 `.`
fn with_period(note: String) -> String {
    let trimmed = note.trim_end();
    if trimmed.ends_with('.') {
        trimmed.to_string()
    } else {
        format!("{}.", trimmed)
    }
}
