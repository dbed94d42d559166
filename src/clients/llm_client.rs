//! LLM 客户端
//!
//! 模型被当作黑盒：提示词进，文本出。输出格式不可信，由调用方解析和修复。
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）
//! - 每次调用有超时，网络类错误按 [`RetryPolicy`] 退避重试

use std::future::Future;
use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};
use crate::utils::{retry_with_backoff, RetryPolicy};

const SYSTEM_MESSAGE: &str = "You are an expert in pesticide regulation and food safety. \
    You answer strictly in the requested list format without any explanation.";

/// 文本补全能力
///
/// 业务层只依赖这个 trait，测试中用按脚本应答的替身代替真实模型。
pub trait CompletionClient {
    fn complete(&self, prompt: &str) -> impl Future<Output = AppResult<String>> + Send;
}

/// LLM 客户端
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model_name: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            timeout: config.llm_timeout(),
            retry: RetryPolicy::new(config.max_retries, config.retry_base_delay()),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 单次调用，不重试
    async fn send_once(&self, prompt: &str) -> AppResult<String> {
        debug!(
            "调用 LLM API，模型: {}，提示词长度: {} 字符",
            self.model_name,
            prompt.chars().count()
        );

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(SYSTEM_MESSAGE)
            .build()
            .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(0.0)
            .max_tokens(4096u32)
            .build()
            .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| LlmError::Timeout {
                model: self.model_name.clone(),
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        debug!("LLM API 调用成功，返回 {} 字符", content.chars().count());
        Ok(content.trim().to_string())
    }
}

impl CompletionClient for LlmClient {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        retry_with_backoff("LLM 调用", self.retry, || self.send_once(prompt)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_takes_settings_from_config() {
        let config = Config {
            llm_model_name: "qwen-plus".to_string(),
            llm_timeout_secs: 7,
            max_retries: 0,
            ..Config::default()
        };
        let client = LlmClient::new(&config);
        assert_eq!(client.model_name(), "qwen-plus");
        assert_eq!(client.timeout, Duration::from_secs(7));
        assert_eq!(client.retry.max_attempts, 1);
    }

    #[tokio::test]
    #[ignore] // 需要真实的 LLM_API_KEY：cargo test -- --ignored
    async fn test_real_endpoint_answers() {
        let config = Config::from_env().unwrap();
        let client = LlmClient::new(&config);
        let answer = client
            .complete("Answer with the Python list [\"ok\"] and nothing else.")
            .await
            .unwrap();
        assert!(answer.contains("ok"));
    }
}
