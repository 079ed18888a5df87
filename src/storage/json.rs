//! JSON-file storage implementation.
//!
//! One pretty-printed JSON file per collection under the configured data
//! directory. Every mutation holds the write lock across the file write, so
//! concurrent upserts to the same URL are serialized and the unique-URL
//! constraint holds under concurrent item tasks.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::models::{BookRecord, ChangeEntry, ChangeKind, DailyReport, SessionActivity};
use crate::storage::CatalogStore;

const BOOKS_FILE: &str = "books.json";
const CHANGE_LOG_FILE: &str = "change_log.json";
const SESSION_LOG_FILE: &str = "session_log.json";
const REPORTS_FILE: &str = "reports.json";

/// JSON-file storage backend.
pub struct JsonStore {
    data_dir: PathBuf,
    state: RwLock<StoreState>,
}

#[derive(Default)]
struct StoreState {
    records: BTreeMap<String, BookRecord>,
    change_log: Vec<ChangeEntry>,
    session_log: Vec<SessionActivity>,
    reports: Vec<DailyReport>,
}

impl JsonStore {
    /// Open a store rooted at the given directory, loading any collections
    /// already on disk.
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir).await?;

        let state = StoreState {
            records: read_json(&data_dir.join(BOOKS_FILE))
                .await?
                .unwrap_or_default(),
            change_log: read_json(&data_dir.join(CHANGE_LOG_FILE))
                .await?
                .unwrap_or_default(),
            session_log: read_json(&data_dir.join(SESSION_LOG_FILE))
                .await?
                .unwrap_or_default(),
            reports: read_json(&data_dir.join(REPORTS_FILE))
                .await?
                .unwrap_or_default(),
        };

        Ok(Self {
            data_dir,
            state: RwLock::new(state),
        })
    }

    /// Write one collection atomically (write to temp, then rename).
    async fn persist<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<()> {
        let path = self.data_dir.join(file);
        let bytes = serde_json::to_vec_pretty(value)?;

        let tmp = path.with_extension("tmp");
        let mut f = tokio::fs::File::create(&tmp).await?;
        f.write_all(&bytes).await?;
        f.flush().await?;
        drop(f);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// Read a JSON file, returning None if it doesn't exist.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

#[async_trait]
impl CatalogStore for JsonStore {
    async fn find_record(&self, url: &str) -> Result<Option<BookRecord>> {
        let state = self.state.read().await;
        Ok(state.records.get(url).cloned())
    }

    async fn insert_record(&self, record: BookRecord) -> Result<()> {
        let mut state = self.state.write().await;
        let url = record.book.url.clone();
        if state.records.contains_key(&url) {
            return Err(AppError::DuplicateUrl(url));
        }
        state.records.insert(url, record);
        self.persist(BOOKS_FILE, &state.records).await
    }

    async fn update_record(&self, record: BookRecord) -> Result<()> {
        let mut state = self.state.write().await;
        state.records.insert(record.book.url.clone(), record);
        self.persist(BOOKS_FILE, &state.records).await
    }

    async fn count_new_since(&self, since: DateTime<Utc>) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state
            .records
            .values()
            .filter(|r| r.first_seen >= since)
            .count() as u64)
    }

    async fn append_change(&self, entry: ChangeEntry) -> Result<()> {
        let mut state = self.state.write().await;
        state.change_log.push(entry);
        self.persist(CHANGE_LOG_FILE, &state.change_log).await
    }

    async fn changes_since(&self, since: DateTime<Utc>) -> Result<Vec<ChangeEntry>> {
        let state = self.state.read().await;
        let mut changes: Vec<ChangeEntry> = state
            .change_log
            .iter()
            .filter(|e| e.timestamp >= since)
            .cloned()
            .collect();
        changes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(changes)
    }

    async fn count_updates_since(&self, since: DateTime<Utc>) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state
            .change_log
            .iter()
            .filter(|e| e.kind == ChangeKind::Updated && e.timestamp >= since)
            .count() as u64)
    }

    async fn session_urls(&self, session_id: &str) -> Result<HashSet<String>> {
        let state = self.state.read().await;
        Ok(state
            .session_log
            .iter()
            .filter(|a| a.session_id == session_id)
            .map(|a| a.url.clone())
            .collect())
    }

    async fn latest_session_id(&self) -> Result<Option<String>> {
        let state = self.state.read().await;
        Ok(state.session_log.last().map(|a| a.session_id.clone()))
    }

    async fn append_session_activity(&self, activity: SessionActivity) -> Result<()> {
        let mut state = self.state.write().await;
        state.session_log.push(activity);
        self.persist(SESSION_LOG_FILE, &state.session_log).await
    }

    async fn clear_session_log(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.session_log.clear();
        self.persist(SESSION_LOG_FILE, &state.session_log).await
    }

    async fn insert_report(&self, report: DailyReport) -> Result<()> {
        let mut state = self.state.write().await;
        state.reports.push(report);
        self.persist(REPORTS_FILE, &state.reports).await
    }
}
