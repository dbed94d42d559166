pub mod eu_feed_client;
pub mod llm_client;
#[cfg(test)]
pub mod scripted;

pub use eu_feed_client::EuFeedClient;
pub use llm_client::{CompletionClient, LlmClient};
#[cfg(test)]
pub use scripted::ScriptedLlm;
