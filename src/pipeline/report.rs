//! Post-run report aggregation.

use chrono::{DateTime, Utc};
use log::info;

use crate::error::Result;
use crate::models::DailyReport;
use crate::services::Notifier;
use crate::storage::CatalogStore;

/// Summarize everything that changed since `since`, notify, and persist
/// the report.
///
/// The notifier always sees the full change list; `changelog_limit` only
/// bounds what the persisted report keeps (newest N when positive, all
/// for -1, none otherwise). The summary message goes out last, even for
/// a run with no changes.
pub async fn generate_report(
    store: &dyn CatalogStore,
    notifier: &mut Notifier,
    changelog_limit: i64,
    since: DateTime<Utc>,
) -> Result<DailyReport> {
    let new_books = store.count_new_since(since).await?;
    let updated_books = store.count_updates_since(since).await?;
    let changes = store.changes_since(since).await?;

    notifier.dispatch(&changes).await;

    let retained = match changelog_limit {
        n if n > 0 => changes.into_iter().take(n as usize).collect(),
        -1 => changes,
        _ => Vec::new(),
    };

    let report = DailyReport {
        date: Utc::now(),
        new_books,
        updated_books,
        changes: retained,
    };
    store.insert_report(report.clone()).await?;
    info!(
        "Report stored: {new_books} new, {updated_books} updated, {} change(s) retained",
        report.changes.len()
    );

    notifier.send_summary(&report).await;
    Ok(report)
}
