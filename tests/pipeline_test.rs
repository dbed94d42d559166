use std::sync::Mutex;

use mrl_compare::infrastructure::MrlStore;
use mrl_compare::models::{Chapter, EuSnapshot, EuropeanRecord, Mrl};
use mrl_compare::services::mrl_reconciler::NO_MATCH_NOTE;
use mrl_compare::services::ReportWriter;
use mrl_compare::{AppResult, CompletionClient, ComparisonFlow, Config, LlmClient};

fn chapter(pesticide: &str, text: &str) -> Chapter {
    Chapter {
        pesticide: pesticide.to_string(),
        text: text.to_string(),
        version: "GB2763-2021".to_string(),
        offset: 0,
    }
}

fn seeded_store() -> MrlStore {
    let mut store = MrlStore::open_in_memory().unwrap();
    store
        .insert_chinese_records(&[
            chapter("Zoxamide", "4.15 Zoxamide\nwheat 0.02"),
            chapter("Unknownicide", "4.16 Unknownicide\nwheat 0.1\nrice 0.2"),
        ])
        .unwrap();
    store
        .insert_eu_records(&EuSnapshot {
            applicable: vec![EuropeanRecord::new("Zoxamide", "wheat", Mrl::new(0.05))],
            not_yet_applicable: vec![EuropeanRecord::new("Zoxamide", "rice", Mrl::new(0.5))],
        })
        .unwrap();
    store
}

/// 按提示词子串回答的模型替身，没有匹配时回答 `[]`
struct CannedLlm {
    rules: Vec<(&'static str, &'static str)>,
    prompts: Mutex<Vec<String>>,
}

impl CannedLlm {
    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl CompletionClient for CannedLlm {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(*needle))
            .map_or("[]", |(_, reply)| *reply);
        Ok(reply.to_string())
    }
}

fn scripted() -> CannedLlm {
    CannedLlm {
        rules: vec![
            ("Chinese values (csv)", r#"[["wheat", "wheat", 0.02, 0.05, ""]]"#),
            ("names the pesticide \"Zoxamide\"", r#"["Zoxamide"]"#),
            ("Pesticide: Zoxamide", r#"[["wheat", 0.02]]"#),
            ("Pesticide: Unknownicide", r#"[["wheat", 0.1], ["rice", 0.2]]"#),
        ],
        prompts: Mutex::new(Vec::new()),
    }
}

fn keywords(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_bridged_pesticide_takes_stricter_limit() {
    let dir = tempfile::tempdir().unwrap();
    let writer = ReportWriter::with_path(dir.path().join("out.json"));
    let store = seeded_store();
    let llm = scripted();

    let rows = ComparisonFlow::new(&Config::default())
        .run(&store, &llm, &keywords(&["Zoxamide"]), &writer)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].chi_pesticide, "Zoxamide");
    assert_eq!(rows[0].eu_pesticide, "Zoxamide");
    assert_eq!(rows[0].chi_food, "wheat");
    assert_eq!(rows[0].valid_mrl, Mrl::new(0.02));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(writer.path()).unwrap()).unwrap();
    assert_eq!(report["row_count"], 1);
    assert_eq!(report["rows"][0]["valid_mrl"], 0.02);
}

#[tokio::test]
async fn test_unmatched_pesticide_yields_one_summary_row() {
    let dir = tempfile::tempdir().unwrap();
    let writer = ReportWriter::with_path(dir.path().join("out.json"));
    let store = seeded_store();
    let llm = scripted();

    let rows = ComparisonFlow::new(&Config::default())
        .run(&store, &llm, &keywords(&["Unknownicide"]), &writer)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].eu_pesticide, "/");
    assert_eq!(rows[0].note, NO_MATCH_NOTE);
    assert!(rows[0].valid_mrl.is_missing());
}

#[tokio::test]
async fn test_no_hits_returns_empty_report() {
    let dir = tempfile::tempdir().unwrap();
    let writer = ReportWriter::with_path(dir.path().join("out.json"));
    let store = seeded_store();
    let llm = scripted();

    let rows = ComparisonFlow::new(&Config::default())
        .run(&store, &llm, &keywords(&["Glyphosate"]), &writer)
        .await
        .unwrap();

    assert!(rows.is_empty());
    assert!(llm.prompts().is_empty());
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(writer.path()).unwrap()).unwrap();
    assert_eq!(report["row_count"], 0);
}

#[tokio::test]
async fn test_blank_keywords_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let writer = ReportWriter::with_path(dir.path().join("out.json"));
    let result = ComparisonFlow::new(&Config::default())
        .run(&seeded_store(), &scripted(), &keywords(&[" "]), &writer)
        .await;
    assert!(result.is_err());
    assert!(!writer.path().exists());
}

#[tokio::test]
async fn test_rerun_and_concurrent_run_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let writer = ReportWriter::with_path(dir.path().join("out.json"));
    let store = seeded_store();
    let llm = scripted();
    let words = keywords(&["Zoxamide", "Unknownicide", "wheat"]);

    let sequential = ComparisonFlow::new(&Config::default());
    let first = sequential.run(&store, &llm, &words, &writer).await.unwrap();
    let second = sequential.run(&store, &llm, &words, &writer).await.unwrap();

    let concurrent = ComparisonFlow::new(&Config {
        max_concurrent_llm_calls: 4,
        ..Config::default()
    });
    let third = concurrent.run(&store, &llm, &words, &writer).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first, third);
    assert_eq!(first.len(), 2);
}

#[tokio::test]
#[ignore] // 需要真实模型：LLM_API_KEY=... cargo test -- --ignored
async fn test_real_model_comparison() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env().unwrap();
    let llm = LlmClient::new(&config);
    let dir = tempfile::tempdir().unwrap();
    let writer = ReportWriter::with_path(dir.path().join("out.json"));

    let rows = ComparisonFlow::new(&config)
        .run(&seeded_store(), &llm, &keywords(&["Zoxamide"]), &writer)
        .await
        .unwrap();

    assert!(!rows.is_empty());
    assert!(rows.iter().all(|r| r.chi_pesticide == "Zoxamide"));
}
