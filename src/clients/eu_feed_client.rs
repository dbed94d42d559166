//! EU 农药残留限量数据源客户端
//!
//! 下载 EU DataLake 的完整 MRL 数据（JSON），解析为原始记录。清洗和分区由
//! [`crate::services::eu_feed`] 负责。

use std::time::Duration;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppError, AppResult, FeedError};
use crate::services::eu_feed::{self, RawEuRecord};
use crate::utils::{retry_with_backoff, RetryPolicy};

const USER_AGENT: &str = concat!("mrl-compare/", env!("CARGO_PKG_VERSION"));

/// EU 数据源客户端
pub struct EuFeedClient {
    client: reqwest::Client,
    url: String,
    retry: RetryPolicy,
}

impl EuFeedClient {
    /// 创建新的 EU 数据源客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::feed_request_failed(&config.eu_feed_url, e))?;

        Ok(Self {
            client,
            url: config.eu_feed_url.clone(),
            retry: RetryPolicy::new(config.max_retries, config.retry_base_delay()),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// 下载并解析完整数据
    pub async fn fetch_eu_feed(&self) -> AppResult<Vec<RawEuRecord>> {
        info!("🌐 正在下载 EU 数据: {}", self.url);
        let body = retry_with_backoff("EU 数据下载", self.retry, || self.download()).await?;
        debug!("EU 数据下载完成，{} 字节", body.len());

        let records = eu_feed::parse_feed(&body)?;
        info!("✓ EU 数据解析完成，共 {} 条原始记录", records.len());
        Ok(records)
    }

    async fn download(&self) -> AppResult<String> {
        let resp = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AppError::feed_request_failed(&self.url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::BadStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            }
            .into());
        }

        resp.text()
            .await
            .map_err(|e| AppError::feed_request_failed(&self.url, e))
    }
}
