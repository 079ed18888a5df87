//! Crawl session lifecycle and the in-run visited set.

use std::collections::HashSet;
use std::sync::Mutex;

use log::info;

use crate::error::Result;
use crate::models::new_session_id;
use crate::storage::CatalogStore;

/// One crawl run's identity plus the URLs it has already processed.
///
/// The visited set is shared across concurrent item tasks; the lock is
/// only ever held for a lookup or an insert, never across an await.
pub struct CrawlSession {
    id: String,
    visited: Mutex<HashSet<String>>,
}

impl CrawlSession {
    /// Start a brand-new session: the persisted session log is cleared and
    /// a fresh identifier minted.
    pub async fn start_fresh(store: &dyn CatalogStore) -> Result<Self> {
        store.clear_session_log().await?;
        let id = new_session_id();
        info!("Starting session {id}");
        Ok(Self {
            id,
            visited: Mutex::new(HashSet::new()),
        })
    }

    /// Resume the most recent logged session, preloading its processed
    /// URLs. With nothing to resume this degrades to a fresh session,
    /// without clearing anything.
    pub async fn resume(store: &dyn CatalogStore) -> Result<Self> {
        match store.latest_session_id().await? {
            Some(id) => {
                let visited = store.session_urls(&id).await?;
                info!("Resuming session {id}, {} URL(s) already processed", visited.len());
                Ok(Self {
                    id,
                    visited: Mutex::new(visited),
                })
            }
            None => {
                let id = new_session_id();
                info!("Nothing to resume, starting session {id}");
                Ok(Self {
                    id,
                    visited: Mutex::new(HashSet::new()),
                })
            }
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether this run already processed `url`.
    pub fn is_visited(&self, url: &str) -> bool {
        self.visited
            .lock()
            .expect("visited set lock poisoned")
            .contains(url)
    }

    /// Record `url` as processed. Returns false when it already was.
    pub fn mark_visited(&self, url: &str) -> bool {
        self.visited
            .lock()
            .expect("visited set lock poisoned")
            .insert(url.to_string())
    }
}
