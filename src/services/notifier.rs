// src/services/notifier.rs

//! Grouped change notifications.
//!
//! Changes from one run are bucketed into new books, price changes, stock
//! changes and everything else, with one HTML message per non-empty
//! bucket. Delivery goes through the `Mailer` seam; failures are retried
//! and then dropped, never escalated, and a per-run quota caps how many
//! messages a single run may send.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde_json::Value;

use crate::error::Result;
use crate::models::{
    AVAILABILITY_FIELD, ChangeEntry, ChangeKind, Config, DailyReport, PRICE_FIELDS,
};
use crate::storage::CatalogStore;
use crate::utils::retry::RetryPolicy;

/// One outgoing notification.
#[derive(Debug, Clone)]
pub struct MailMessage {
    pub subject: String,
    pub body: String,
    pub recipient: String,
    pub html: bool,
}

/// Delivery backend for notifications.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<()>;
}

/// Mailer that writes messages to the log instead of sending them.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        info!(
            "Mail to {} [{}]\n{}",
            message.recipient, message.subject, message.body
        );
        Ok(())
    }
}

/// Per-run cap on outgoing messages.
#[derive(Debug)]
pub struct MailQuota {
    remaining: u32,
}

impl MailQuota {
    pub fn new(limit: u32) -> Self {
        Self { remaining: limit }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    fn try_take(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Buckets change entries and dispatches grouped notifications.
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    store: Arc<dyn CatalogStore>,
    recipient: String,
    policy: RetryPolicy,
    quota: MailQuota,
}

impl Notifier {
    pub fn new(config: &Config, mailer: Arc<dyn Mailer>, store: Arc<dyn CatalogStore>) -> Self {
        Self {
            mailer,
            store,
            recipient: config.notify.recipient.clone(),
            policy: RetryPolicy::new(
                config.notify.mail_retry_count,
                Duration::from_millis(config.notify.mail_backoff_base_ms),
            ),
            quota: MailQuota::new(config.notify.mail_quota),
        }
    }

    /// Send one grouped message per non-empty change bucket.
    ///
    /// An updated entry touching a price field is a price change even when
    /// the stock moved too; availability only claims entries no price field
    /// touched.
    pub async fn dispatch(&mut self, changes: &[ChangeEntry]) {
        if changes.is_empty() {
            debug!("No changes to notify about");
            return;
        }

        let mut created = Vec::new();
        let mut price = Vec::new();
        let mut availability = Vec::new();
        let mut other = Vec::new();

        for entry in changes {
            match entry.kind {
                ChangeKind::Created => created.push(entry),
                ChangeKind::Updated if entry.touches_price() => price.push(entry),
                ChangeKind::Updated if entry.touches_availability() => availability.push(entry),
                ChangeKind::Updated => other.push(entry),
            }
        }

        if !created.is_empty() {
            let body = self.compose_created(&created).await;
            self.send(format!("{} new book(s) added", created.len()), body)
                .await;
        }
        if !price.is_empty() {
            let body = self.compose_price_changes(&price).await;
            self.send(format!("{} book price change(s)", price.len()), body)
                .await;
        }
        if !availability.is_empty() {
            let body = self.compose_stock_changes(&availability).await;
            self.send(
                format!("{} stock level change(s)", availability.len()),
                body,
            )
            .await;
        }
        if !other.is_empty() {
            let body = self.compose_other_changes(&other).await;
            self.send(format!("{} other book change(s)", other.len()), body)
                .await;
        }
    }

    /// Send the end-of-run summary. Always one message, even for a run
    /// that changed nothing.
    pub async fn send_summary(&mut self, report: &DailyReport) {
        let body = format!(
            "<b>New books:</b> {}<br><b>Updated books:</b> {}<br><b>Changes retained:</b> {}",
            report.new_books,
            report.updated_books,
            report.changes.len()
        );
        self.send(
            format!("Daily report for {}", report.date.format("%Y-%m-%d")),
            body,
        )
        .await;
    }

    async fn compose_created(&self, entries: &[&ChangeEntry]) -> String {
        let mut lines = vec!["<h2>New Books</h2>".to_string(), "<ul>".to_string()];
        for entry in entries {
            let Ok(Some(record)) = self.store.find_record(&entry.url).await else {
                continue;
            };
            lines.push(format!(
                "<li><b>{}</b> in <i>{}</i> (price £{:.2}, {} in stock)<br><a href=\"{}\">View book</a></li>",
                record.book.title,
                record.book.category,
                record.book.price_incl_tax,
                record.book.availability,
                entry.url
            ));
        }
        lines.push("</ul>".to_string());
        lines.join("\n")
    }

    async fn compose_price_changes(&self, entries: &[&ChangeEntry]) -> String {
        let mut lines = vec!["<h2>Price Changes</h2>".to_string(), "<ul>".to_string()];
        for entry in entries {
            let Ok(Some(record)) = self.store.find_record(&entry.url).await else {
                continue;
            };
            let moves: Vec<String> = PRICE_FIELDS
                .iter()
                .filter_map(|field| entry.changed_fields.get(*field).map(|c| (field, c)))
                .map(|(field, change)| {
                    format!("{field} {} → {}", fmt_price(&change.old), fmt_price(&change.new))
                })
                .collect();
            lines.push(format!(
                "<li><b>{}</b> ({}): {}<br><a href=\"{}\">View book</a></li>",
                record.book.title,
                record.book.category,
                moves.join(", "),
                entry.url
            ));
        }
        lines.push("</ul>".to_string());
        lines.join("\n")
    }

    async fn compose_stock_changes(&self, entries: &[&ChangeEntry]) -> String {
        let mut lines = vec!["<h2>Stock Changes</h2>".to_string(), "<ul>".to_string()];
        for entry in entries {
            let Ok(Some(record)) = self.store.find_record(&entry.url).await else {
                continue;
            };
            let Some(change) = entry.changed_fields.get(AVAILABILITY_FIELD) else {
                continue;
            };
            lines.push(format!(
                "<li><b>{}</b> ({}): stock {} → {}<br><a href=\"{}\">View book</a></li>",
                record.book.title,
                record.book.category,
                fmt_value(&change.old),
                fmt_value(&change.new),
                entry.url
            ));
        }
        lines.push("</ul>".to_string());
        lines.join("\n")
    }

    async fn compose_other_changes(&self, entries: &[&ChangeEntry]) -> String {
        let mut lines = vec!["<h2>Other Changes</h2>".to_string(), "<ul>".to_string()];
        for entry in entries {
            let Ok(Some(record)) = self.store.find_record(&entry.url).await else {
                continue;
            };
            let details: Vec<String> = entry
                .changed_fields
                .iter()
                .map(|(field, change)| {
                    format!("{field}: {} → {}", fmt_value(&change.old), fmt_value(&change.new))
                })
                .collect();
            lines.push(format!(
                "<li><b>{}</b> ({}): {}<br><a href=\"{}\">View book</a></li>",
                record.book.title,
                record.book.category,
                details.join("; "),
                entry.url
            ));
        }
        lines.push("</ul>".to_string());
        lines.join("\n")
    }

    async fn send(&mut self, subject: String, body: String) {
        if !self.quota.try_take() {
            warn!("Mail quota spent, dropping '{subject}'");
            return;
        }

        let message = MailMessage {
            subject,
            body,
            recipient: self.recipient.clone(),
            html: true,
        };

        let result = self
            .policy
            .run("send mail", |_| true, || self.mailer.send(&message))
            .await;
        match result {
            Ok(()) => debug!("Sent '{}'", message.subject),
            Err(e) => error!("Giving up on '{}': {e}", message.subject),
        }
    }
}

fn fmt_price(value: &Value) -> String {
    value
        .as_f64()
        .map(|p| format!("£{p:.2}"))
        .unwrap_or_else(|| value.to_string())
}

fn fmt_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
