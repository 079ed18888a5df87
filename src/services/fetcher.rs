// src/services/fetcher.rs

//! Page fetching with bounded retry.

use std::time::Duration;

use log::{debug, warn};
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;
use crate::utils::retry::RetryPolicy;

/// HTTP page fetcher: one GET per call, retried with exponential backoff.
///
/// Exhausted retries surface as `None`, never as an error, so callers
/// always get an optional body.
pub struct PageFetcher {
    client: Client,
    policy: RetryPolicy,
    retry_on_empty: bool,
}

impl PageFetcher {
    /// Build a fetcher from crawler settings.
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            policy: RetryPolicy::new(
                config.retry_count,
                Duration::from_millis(config.backoff_base_ms),
            ),
            retry_on_empty: config.retry_on_empty,
        })
    }

    /// Fetch one page body. Non-2xx statuses, transport errors and (under
    /// configuration) empty bodies count as retryable failures.
    pub async fn fetch(&self, url: &str) -> Option<String> {
        let result = self
            .policy
            .run(url, AppError::is_retryable, || self.attempt(url))
            .await;

        match result {
            Ok(body) => {
                debug!("Fetched {url} ({} bytes)", body.len());
                Some(body)
            }
            Err(e) => {
                warn!("Giving up on {url}: {e}");
                None
            }
        }
    }

    async fn attempt(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;
        if body.is_empty() && self.retry_on_empty {
            return Err(AppError::EmptyBody(url.to_string()));
        }
        Ok(body)
    }
}
