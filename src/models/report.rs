//! Daily report structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::change::ChangeEntry;

/// Persisted summary of one crawl run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReport {
    /// When the report was generated
    pub date: DateTime<Utc>,

    /// Records created since the run started
    pub new_books: u64,

    /// Records updated since the run started
    pub updated_books: u64,

    /// Change entries retained per the configured limit, newest first
    pub changes: Vec<ChangeEntry>,
}
