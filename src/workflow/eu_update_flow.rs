//! EU 数据更新流程 - 流程层
//!
//! 下载 → 清洗分区 → 整体替换数据库中的快照

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::clients::EuFeedClient;
use crate::infrastructure::MrlStore;
use crate::models::EuSnapshot;
use crate::services::eu_feed::{self, RawEuRecord};

/// EU 数据更新流程
pub struct EuUpdateFlow {
    feed: EuFeedClient,
}

impl EuUpdateFlow {
    pub fn new(feed: EuFeedClient) -> Self {
        Self { feed }
    }

    /// 下载最新数据并替换数据库中的快照
    ///
    /// 下载或写入失败时旧快照保持不变。
    pub async fn run(&self, store: &mut MrlStore) -> Result<EuSnapshot> {
        let raw = self
            .feed
            .fetch_eu_feed()
            .await
            .with_context(|| format!("下载 EU 数据失败: {}", self.feed.url()))?;
        let today = chrono::Local::now().date_naive();
        replace_snapshot(store, raw, today)
    }
}

/// 分区并写入；空数据不覆盖已有快照
fn replace_snapshot(
    store: &mut MrlStore,
    raw: Vec<RawEuRecord>,
    today: NaiveDate,
) -> Result<EuSnapshot> {
    let snapshot = eu_feed::partition(raw, today);
    if snapshot.is_empty() {
        warn!("⚠️ EU 数据为空，保留数据库中的旧数据");
        return Ok(snapshot);
    }

    store
        .insert_eu_records(&snapshot)
        .context("写入 EU 数据失败")?;
    info!(
        "✅ EU 数据更新完成: 生效 {} 条，尚未生效 {} 条",
        snapshot.applicable.len(),
        snapshot.not_yet_applicable.len()
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_snapshot_replaces_store_contents() {
        let mut store = MrlStore::open_in_memory().unwrap();
        let raw = eu_feed::parse_feed(
            r#"[
                {"pesticide_residue_name": "Zoxamide", "product_code": "0500090", "product_name": "Wheat",
                 "mrl_value_only": 0.05, "applicability_text": "Applicable", "application_date": null},
                {"pesticide_residue_name": "Acephate", "product_code": "0500090", "product_name": "Wheat",
                 "mrl_value_only": 0.1, "applicability_text": "Not yet applicable", "application_date": null}
            ]"#,
        )
        .unwrap();

        let snapshot = replace_snapshot(&mut store, raw, today()).unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(store.list_all_eu_pesticide_names().unwrap(), vec!["Zoxamide"]);
        assert_eq!(store.counts().unwrap(), (0, 1, 1));
    }

    #[test]
    fn test_empty_feed_keeps_previous_snapshot() {
        let mut store = MrlStore::open_in_memory().unwrap();
        let raw = eu_feed::parse_feed(
            r#"[{"pesticide_residue_name": "Zoxamide", "product_name": "Wheat", "mrl_value_only": 0.05}]"#,
        )
        .unwrap();
        replace_snapshot(&mut store, raw, today()).unwrap();

        replace_snapshot(&mut store, Vec::new(), today()).unwrap();

        assert_eq!(store.list_all_eu_pesticide_names().unwrap(), vec!["Zoxamide"]);
    }
}
