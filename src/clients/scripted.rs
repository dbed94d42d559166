//! 按脚本应答的补全客户端
//!
//! 按提示词中包含的子串选择应答，第一个匹配的规则生效，没有匹配时回答 `[]`。
//! 只在单元测试中编译。

use std::sync::Mutex;

use crate::clients::CompletionClient;
use crate::error::{AppError, AppResult};

enum Reply {
    Text(String),
    Fail(String),
}

/// 脚本化的 LLM
pub struct ScriptedLlm {
    rules: Vec<(String, Reply)>,
    prompts: Mutex<Vec<String>>,
}

impl Default for ScriptedLlm {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedLlm {
    /// 没有规则匹配时回答 `[]`
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// 提示词包含 `needle` 时回答 `reply`
    pub fn on(mut self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Reply::Text(reply.into())));
        self
    }

    /// 提示词包含 `needle` 时返回 API 错误
    pub fn fail_on(mut self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Reply::Fail(message.into())));
        self
    }

    /// 收到过的全部提示词，按调用顺序
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    fn answer(&self, prompt: &str) -> AppResult<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        match self.rules.iter().find(|(needle, _)| prompt.contains(needle.as_str())) {
            Some((_, Reply::Text(text))) => Ok(text.clone()),
            Some((_, Reply::Fail(message))) => Err(AppError::llm_api_failed("scripted", message)),
            None => Ok("[]".to_string()),
        }
    }
}

impl CompletionClient for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        self.answer(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_matching_rule_wins() {
        let llm = ScriptedLlm::new()
            .on("Zoxamide", "[\"Zoxamide\"]")
            .on("Zox", "never")
            .fail_on("boom", "down");

        assert_eq!(llm.complete("about Zoxamide").await.unwrap(), "[\"Zoxamide\"]");
        assert_eq!(llm.complete("other").await.unwrap(), "[]");
        assert!(llm.complete("boom").await.is_err());
        assert_eq!(llm.prompts().len(), 3);
    }
}
