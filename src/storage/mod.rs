//! Storage abstractions for catalog persistence.
//!
//! The store is the sole durable owner of book records, the append-only
//! change log, session activity, and generated reports.
//!
//! ## Directory Structure
//!
//! ```text
//! data/
//! ├── books.json          # Records keyed by URL
//! ├── change_log.json     # Append-only change entries
//! ├── session_log.json    # Per-session processed URLs
//! └── reports.json        # Generated daily reports
//! ```

pub mod json;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{BookRecord, ChangeEntry, DailyReport, SessionActivity};

// Re-export for convenience
pub use json::JsonStore;

/// Trait for catalog storage backends.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Look up the stored record for a URL.
    async fn find_record(&self, url: &str) -> Result<Option<BookRecord>>;

    /// Insert a brand-new record. Fails with a duplicate-URL error when a
    /// record with the same URL already exists.
    async fn insert_record(&self, record: BookRecord) -> Result<()>;

    /// Replace the stored record carrying the same URL.
    async fn update_record(&self, record: BookRecord) -> Result<()>;

    /// Count records first seen at or after `since`.
    async fn count_new_since(&self, since: DateTime<Utc>) -> Result<u64>;

    /// Append one change entry. The log is append-only.
    async fn append_change(&self, entry: ChangeEntry) -> Result<()>;

    /// All change entries stamped at or after `since`, newest first.
    async fn changes_since(&self, since: DateTime<Utc>) -> Result<Vec<ChangeEntry>>;

    /// Count update-kind change entries stamped at or after `since`.
    async fn count_updates_since(&self, since: DateTime<Utc>) -> Result<u64>;

    /// Distinct URLs already processed by the given session.
    async fn session_urls(&self, session_id: &str) -> Result<HashSet<String>>;

    /// Session id of the most recent activity row, if any.
    async fn latest_session_id(&self) -> Result<Option<String>>;

    /// Record one processed URL for a session.
    async fn append_session_activity(&self, activity: SessionActivity) -> Result<()>;

    /// Drop all session activity. Precedes every fresh, non-resumed run.
    async fn clear_session_log(&self) -> Result<()>;

    /// Persist a generated report.
    async fn insert_report(&self, report: DailyReport) -> Result<()>;
}
