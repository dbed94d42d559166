//! EU 数据清洗与分区
//!
//! 原始数据只保留六个字段，去掉完全重复的行和已失效（"No longer applicable"）的行，
//! 然后分成当前生效与尚未生效两部分，各自按 (农药名, 产品代码) 排序。

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::error::{AppResult, FeedError};
use crate::models::{EuSnapshot, EuropeanRecord, Mrl};

const NO_LONGER_APPLICABLE: &str = "No longer applicable";
const NOT_YET_APPLICABLE: &str = "Not yet applicable";

/// 数据源中的一条记录（只保留需要的字段）
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawEuRecord {
    #[serde(default, deserialize_with = "text_or_number")]
    pub pesticide_residue_name: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub product_code: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub product_name: String,
    #[serde(default)]
    pub mrl_value_only: Mrl,
    #[serde(default)]
    pub applicability_text: Option<String>,
    #[serde(default)]
    pub application_date: Option<String>,
}

impl RawEuRecord {
    fn dedup_key(&self) -> (String, String, String, String, Option<String>, Option<String>) {
        (
            self.pesticide_residue_name.clone(),
            self.product_code.clone(),
            self.product_name.clone(),
            self.mrl_value_only.to_string(),
            self.applicability_text.clone(),
            self.application_date.clone(),
        )
    }

    fn into_record(self) -> EuropeanRecord {
        EuropeanRecord {
            pesticide_residue_name: self.pesticide_residue_name.trim().to_string(),
            product_name: self.product_name.trim().to_string(),
            mrl_value_only: self.mrl_value_only,
            applicability_text: self.applicability_text.unwrap_or_default(),
            application_date: self.application_date,
        }
    }
}

/// 字段可能是字符串、数字或 null
fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// 解析下载的数据
///
/// 接受裸数组，或包在对象的 `value` / `data` / `items` 字段中的数组。
pub fn parse_feed(body: &str) -> AppResult<Vec<RawEuRecord>> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(FeedError::from)?;

    let array = match value {
        serde_json::Value::Array(_) => value,
        serde_json::Value::Object(mut map) => ["value", "data", "items"]
            .iter()
            .find_map(|key| map.remove(*key).filter(|v| v.is_array()))
            .ok_or_else(|| {
                let keys: Vec<&String> = map.keys().collect();
                FeedError::UnexpectedShape(format!("对象中没有记录数组，字段: {:?}", keys))
            })?,
        other => {
            return Err(FeedError::UnexpectedShape(format!(
                "顶层既不是数组也不是对象: {}",
                crate::utils::truncate_text(&other.to_string(), 80)
            ))
            .into())
        }
    };

    let records: Vec<RawEuRecord> = serde_json::from_value(array).map_err(FeedError::from)?;
    Ok(records)
}

/// 解析生效日期，支持 ISO（可带时间部分）和 `dd/mm/yyyy`
fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    text.get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
        .or_else(|| NaiveDate::parse_from_str(text, "%d/%m/%Y").ok())
}

fn is_not_yet_applicable(record: &RawEuRecord, today: NaiveDate) -> bool {
    let flagged = record
        .applicability_text
        .as_deref()
        .is_some_and(|t| t.contains(NOT_YET_APPLICABLE));
    let future = record
        .application_date
        .as_deref()
        .and_then(parse_date)
        .is_some_and(|date| date > today);
    flagged || future
}

/// 清洗并分区
///
/// # 参数
/// - `raw`: 原始记录
/// - `today`: 判断生效日期的基准日
///
/// # 返回
/// 两个互不相交的分区，合起来是去重、去失效后的全部记录
pub fn partition(raw: Vec<RawEuRecord>, today: NaiveDate) -> EuSnapshot {
    let total = raw.len();
    let mut seen = HashSet::new();
    let mut kept: Vec<RawEuRecord> = raw
        .into_iter()
        .filter(|r| seen.insert(r.dedup_key()))
        .filter(|r| {
            !r.applicability_text
                .as_deref()
                .is_some_and(|t| t.contains(NO_LONGER_APPLICABLE))
        })
        .collect();
    debug!("EU 数据去重、去失效: {} → {}", total, kept.len());

    kept.sort_by(|a, b| {
        (&a.pesticide_residue_name, &a.product_code)
            .cmp(&(&b.pesticide_residue_name, &b.product_code))
    });

    let (not_yet, applicable): (Vec<_>, Vec<_>) = kept
        .into_iter()
        .partition(|r| is_not_yet_applicable(r, today));

    let snapshot = EuSnapshot {
        applicable: applicable.into_iter().map(RawEuRecord::into_record).collect(),
        not_yet_applicable: not_yet.into_iter().map(RawEuRecord::into_record).collect(),
    };
    info!(
        "✓ EU 数据分区完成: 生效 {} 条，尚未生效 {} 条",
        snapshot.applicable.len(),
        snapshot.not_yet_applicable.len()
    );
    snapshot
}
