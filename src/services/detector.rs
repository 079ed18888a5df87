// src/services/detector.rs

//! Change detection for fetched catalog pages.
//!
//! Decides whether a fetched page is a new record, an update, or noise.
//! The raw body is hashed before any parsing so unchanged pages cost one
//! store lookup and nothing else.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use log::debug;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{BookRecord, ChangeEntry, FieldChange, ParsedBook, SessionActivity};
use crate::storage::CatalogStore;
use crate::utils::content_hash;

use super::parser::PageParser;
use super::session::CrawlSession;

/// How one processed page relates to stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Created,
    Updated,
    Unchanged,
}

/// Classifies fetched pages against the store and records the outcome.
#[derive(Clone)]
pub struct ChangeDetector {
    store: Arc<dyn CatalogStore>,
    parser: Arc<PageParser>,
}

impl ChangeDetector {
    pub fn new(store: Arc<dyn CatalogStore>, parser: Arc<PageParser>) -> Self {
        Self { store, parser }
    }

    /// Process one fetched page.
    ///
    /// Returns the classification, or `None` when a concurrent task already
    /// created the record and this task's insert lost the race. Parse
    /// failures propagate without touching the store.
    pub async fn process(
        &self,
        url: &str,
        raw_html: &str,
        session: &CrawlSession,
    ) -> Result<Option<Classification>> {
        let hash = content_hash(raw_html);
        let existing = self.store.find_record(url).await?;

        if let Some(existing) = &existing {
            if existing.content_hash == hash {
                debug!("Unchanged (hash match): {url}");
                return Ok(Some(Classification::Unchanged));
            }
        }

        let book = self.parser.parse_book(raw_html, url)?;
        let now = Utc::now();

        match existing {
            None => {
                let record = BookRecord::new(book, hash, raw_html.to_string(), now);
                match self.store.insert_record(record).await {
                    Ok(()) => {}
                    Err(AppError::DuplicateUrl(_)) => {
                        debug!("Lost create race for {url}, another task got there first");
                        return Ok(None);
                    }
                    Err(e) => return Err(e),
                }
                self.store.append_change(ChangeEntry::created(url, now)).await?;
                self.mark_processed(url, session).await?;
                Ok(Some(Classification::Created))
            }
            Some(previous) => {
                let changed_fields = diff_books(&previous.book, &book);

                if changed_fields.is_empty() {
                    // Markup moved but no field did. Refresh the snapshot so
                    // the next crawl short-circuits, without logging a change
                    // or bumping last_updated.
                    let record = BookRecord {
                        book,
                        content_hash: hash,
                        raw_html: raw_html.to_string(),
                        first_seen: previous.first_seen,
                        last_updated: previous.last_updated,
                    };
                    self.store.update_record(record).await?;
                    debug!("Hash refreshed without field changes: {url}");
                    return Ok(Some(Classification::Unchanged));
                }

                let record = BookRecord {
                    book,
                    content_hash: hash,
                    raw_html: raw_html.to_string(),
                    first_seen: previous.first_seen,
                    last_updated: now,
                };
                self.store.update_record(record).await?;
                self.store
                    .append_change(ChangeEntry::updated(url, changed_fields, now))
                    .await?;
                self.mark_processed(url, session).await?;
                Ok(Some(Classification::Updated))
            }
        }
    }

    async fn mark_processed(&self, url: &str, session: &CrawlSession) -> Result<()> {
        session.mark_visited(url);
        self.store
            .append_session_activity(SessionActivity::new(session.id(), url, Utc::now()))
            .await
    }
}

/// Per-field diff between two parses of the same page: every field present
/// in both whose value differs, mapped to its (old, new) pair.
pub fn diff_books(previous: &ParsedBook, current: &ParsedBook) -> BTreeMap<String, FieldChange> {
    let previous = field_map(previous);
    let mut current = field_map(current);

    let mut changed = BTreeMap::new();
    for (field, old) in previous {
        if let Some(new) = current.remove(&field) {
            if old != new {
                changed.insert(field, FieldChange::new(old, new));
            }
        }
    }
    changed
}

fn field_map(book: &ParsedBook) -> serde_json::Map<String, Value> {
    match serde_json::to_value(book) {
        Ok(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    }
}
