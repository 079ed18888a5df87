//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Target site settings
    #[serde(default)]
    pub site: SiteConfig,

    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Data directory settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Report generation settings
    #[serde(default)]
    pub report: ReportConfig,

    /// Notification settings
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if Url::parse(&self.site.root_url).is_err() {
            return Err(AppError::validation("site.root_url is not a valid URL"));
        }
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.retry_count == 0 {
            return Err(AppError::validation("crawler.retry_count must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.storage.data_dir.trim().is_empty() {
            return Err(AppError::validation("storage.data_dir is empty"));
        }
        if self.report.changelog_limit < -1 {
            return Err(AppError::validation(
                "report.changelog_limit must be -1, 0, or a positive count",
            ));
        }
        if self.notify.recipient.trim().is_empty() {
            return Err(AppError::validation("notify.recipient is empty"));
        }
        Ok(())
    }
}

/// Target site settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Root URL of the catalog site
    #[serde(default = "defaults::root_url")]
    pub root_url: String,
}

impl SiteConfig {
    /// URL of the crawl entry page.
    pub fn index_url(&self) -> String {
        format!("{}/index.html", self.root_url.trim_end_matches('/'))
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root_url: defaults::root_url(),
        }
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Fetch attempts per page before giving up
    #[serde(default = "defaults::retry_count")]
    pub retry_count: u32,

    /// Base backoff delay in milliseconds, doubled after each failed attempt
    #[serde(default = "defaults::backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Treat a 2xx response with an empty body as a retryable failure
    #[serde(default = "defaults::retry_on_empty")]
    pub retry_on_empty: bool,

    /// Maximum concurrent item fetches within one listing page
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            retry_count: defaults::retry_count(),
            backoff_base_ms: defaults::backoff_base_ms(),
            retry_on_empty: defaults::retry_on_empty(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Data directory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the JSON collections
    #[serde(default = "defaults::data_dir")]
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
        }
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Change entries kept in the persisted report:
    /// a positive count keeps the newest N, -1 keeps all, 0 keeps none.
    #[serde(default = "defaults::changelog_limit")]
    pub changelog_limit: i64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            changelog_limit: defaults::changelog_limit(),
        }
    }
}

/// Notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Recipient address for change notifications
    #[serde(default = "defaults::recipient")]
    pub recipient: String,

    /// Maximum messages one run may send
    #[serde(default = "defaults::mail_quota")]
    pub mail_quota: u32,

    /// Send attempts per message before giving up
    #[serde(default = "defaults::mail_retry_count")]
    pub mail_retry_count: u32,

    /// Base backoff delay in milliseconds between send attempts
    #[serde(default = "defaults::mail_backoff_base_ms")]
    pub mail_backoff_base_ms: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            recipient: defaults::recipient(),
            mail_quota: defaults::mail_quota(),
            mail_retry_count: defaults::mail_retry_count(),
            mail_backoff_base_ms: defaults::mail_backoff_base_ms(),
        }
    }
}

mod defaults {
    // Site defaults
    pub fn root_url() -> String {
        "https://books.toscrape.com".into()
    }

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; bookwatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn retry_count() -> u32 {
        3
    }
    pub fn backoff_base_ms() -> u64 {
        1000
    }
    pub fn retry_on_empty() -> bool {
        true
    }
    pub fn max_concurrent() -> usize {
        5
    }

    // Storage defaults
    pub fn data_dir() -> String {
        "data".into()
    }

    // Report defaults
    pub fn changelog_limit() -> i64 {
        -1
    }

    // Notification defaults
    pub fn recipient() -> String {
        "alerts@example.com".into()
    }
    pub fn mail_quota() -> u32 {
        25
    }
    pub fn mail_retry_count() -> u32 {
        3
    }
    pub fn mail_backoff_base_ms() -> u64 {
        1000
    }
}
