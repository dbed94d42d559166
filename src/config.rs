//! 程序配置
//!
//! 进程启动时组装一次，然后显式传入各个组件，不存在全局可变配置。

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::services::mrl_reconciler::DEFAULT_FALLBACK_MRL;
use crate::services::pesticide_bridge::DEFAULT_SIMILARITY_THRESHOLD;

/// EU DataLake 农药残留限量下载地址
pub const DEFAULT_EU_FEED_URL: &str = "https://api.datalake.sante.service.ec.europa.eu/sante/pesticides/pesticide_residues_mrls/download?format=json&language=EN&api-version=v2.0";

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// SQLite 数据库文件
    pub database_path: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 单次 LLM 调用超时（秒）
    pub llm_timeout_secs: u64,
    // --- 重试策略 ---
    /// LLM 与 EU 数据源调用的最大尝试次数
    pub max_retries: u32,
    /// 第一次退避等待（毫秒），之后每次翻倍
    pub retry_base_delay_ms: u64,
    /// 同时进行的 LLM 调用数量，1 表示严格顺序执行
    pub max_concurrent_llm_calls: usize,
    // --- EU 数据源 ---
    pub eu_feed_url: String,
    pub http_timeout_secs: u64,
    // --- 比对参数 ---
    /// 预筛选相似度阈值（0..1）
    pub similarity_threshold: f64,
    /// 只有中国限量时使用的默认有效限量
    pub default_mrl: f64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 提示词模板
    pub prompts: Prompts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "chiprag.sqlite3".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            llm_timeout_secs: 120,
            max_retries: 3,
            retry_base_delay_ms: 500,
            max_concurrent_llm_calls: 1,
            eu_feed_url: DEFAULT_EU_FEED_URL.to_string(),
            http_timeout_secs: 300,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            default_mrl: DEFAULT_FALLBACK_MRL,
            verbose_logging: false,
            prompts: Prompts::default(),
        }
    }
}

impl Config {
    /// 从环境变量读取配置，未设置的项使用默认值
    ///
    /// 设置了 `PROMPT_PATH` 时从该 TOML 文件覆盖提示词模板。
    pub fn from_env() -> Result<Self> {
        let default = Self::default();
        let prompts = match std::env::var("PROMPT_PATH") {
            Ok(path) => Prompts::from_toml_file(Path::new(&path))?,
            Err(_) => default.prompts,
        };

        Ok(Self {
            database_path: std::env::var("DATABASE_PATH").unwrap_or(default.database_path),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            llm_timeout_secs: env_parse("LLM_TIMEOUT_SECS").unwrap_or(default.llm_timeout_secs),
            max_retries: env_parse("MAX_RETRIES").unwrap_or(default.max_retries),
            retry_base_delay_ms: env_parse("RETRY_BASE_DELAY_MS").unwrap_or(default.retry_base_delay_ms),
            max_concurrent_llm_calls: env_parse("MAX_CONCURRENT_LLM_CALLS")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(default.max_concurrent_llm_calls),
            eu_feed_url: std::env::var("EU_FEED_URL").unwrap_or(default.eu_feed_url),
            http_timeout_secs: env_parse("HTTP_TIMEOUT_SECS").unwrap_or(default.http_timeout_secs),
            similarity_threshold: env_parse("SIMILARITY_THRESHOLD").unwrap_or(default.similarity_threshold),
            default_mrl: env_parse("DEFAULT_MRL").unwrap_or(default.default_mrl),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
            prompts,
        })
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// 提示词模板
///
/// 占位符使用 `{name}` 形式，由 [`Prompts::render`] 替换。
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
    /// 占位符：`{keyword}` `{pesticide}` `{text}`
    pub value_extraction: String,
    /// 占位符：`{chinese_pesticide}` `{european_pesticides}`
    pub compare_pesticides: String,
    /// 占位符：`{chinese}` `{european}`
    pub compare_values: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            value_extraction: r#"You are given one chapter of a Chinese regulation on maximum residue limits (MRL) of pesticides in food.
Pesticide: {pesticide}
Search keyword: {keyword}

Extract every food together with its maximum residue limit in mg/kg that is relevant to the search keyword.
If the keyword is the pesticide itself, extract all foods of the chapter.
Answer ONLY with a Python style list of lists, one inner list per food: [["food", mrl], ["food", mrl]].
Use the number only for mrl. Answer [] if nothing is relevant.

Chapter:
{text}"#
                .to_string(),
            compare_pesticides: r#"A Chinese regulation names the pesticide "{chinese_pesticide}".
Below is a list of pesticide residue names used by the European Union:
{european_pesticides}

Return every entry of the list that denotes the same pesticide (including its residue definition).
Answer ONLY with a Python style list of strings copied exactly from the list, for example ["Name A", "Name B"].
Answer [] if no entry matches. Do not invent names."#
                .to_string(),
            compare_values: r#"Compare the maximum residue limits (mg/kg) of one pesticide in China and in the European Union.

Chinese values (csv):
{chinese}
European values (csv):
{european}

Pair every Chinese food with the European product that denotes the same food.
Answer ONLY with a Python style list of lists: [["chinese food", "european food", chinese mrl, european mrl, "note"], ...].
Use "/" for a side that has no fitting food. Use the note to explain uncertain pairings, otherwise "".
Include every Chinese food exactly once."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// 从 TOML 文件加载提示词，缺失的键使用默认模板
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取提示词文件: {}", path.display()))?;
        let prompts: Prompts = toml::from_str(&content)
            .with_context(|| format!("无法解析提示词文件: {}", path.display()))?;
        Ok(prompts)
    }

    /// 用给定的键值替换模板中的 `{key}` 占位符
    pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
        let mut rendered = template.to_string();
        for (key, value) in vars {
            rendered = rendered.replace(&format!("{{{}}}", key), value);
        }
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_render_replaces_all_placeholders() {
        let out = Prompts::render("{a} and {b} and {a}", &[("a", "x"), ("b", "y")]);
        assert_eq!(out, "x and y and x");
    }

    #[test]
    fn test_default_prompts_carry_placeholders() {
        let prompts = Prompts::default();
        assert!(prompts.value_extraction.contains("{text}"));
        assert!(prompts.compare_pesticides.contains("{european_pesticides}"));
        assert!(prompts.compare_values.contains("{chinese}"));
        assert!(prompts.compare_values.contains("{european}"));
    }

    #[test]
    fn test_prompts_from_toml_partial_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "compare_pesticides = \"match {{chinese_pesticide}}\"").unwrap();

        let prompts = Prompts::from_toml_file(file.path()).unwrap();
        assert_eq!(prompts.compare_pesticides, "match {chinese_pesticide}");
        assert_eq!(prompts.value_extraction, Prompts::default().value_extraction);
    }

    #[test]
    fn test_default_config_uses_named_constants() {
        let config = Config::default();
        assert_eq!(config.similarity_threshold, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(config.default_mrl, DEFAULT_FALLBACK_MRL);
        assert_eq!(config.max_concurrent_llm_calls, 1);
    }
}
