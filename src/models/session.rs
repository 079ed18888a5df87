//! Crawl session bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One processed-URL row in the session log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionActivity {
    /// Which crawl run processed the URL
    pub session_id: String,

    /// The processed item URL
    pub url: String,

    /// When the item was processed
    pub timestamp: DateTime<Utc>,
}

impl SessionActivity {
    pub fn new(
        session_id: impl Into<String>,
        url: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            url: url.into(),
            timestamp,
        }
    }
}

/// Mint the identifier for a new crawl session.
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
