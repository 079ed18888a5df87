// src/pipeline/crawl.rs

//! Catalog crawl pipeline.

use std::sync::Arc;

use chrono::Utc;
use log::info;

use crate::error::Result;
use crate::models::Config;
use crate::pipeline::report::generate_report;
use crate::services::{CatalogCrawler, CrawlOutcome, CrawlSession, LogMailer, Mailer, Notifier};
use crate::storage::{CatalogStore, JsonStore};

/// Run one full crawl against the configured data directory: walk the
/// catalog, record every change, then report and notify.
pub async fn run_crawl(config: Arc<Config>, resume: bool) -> Result<CrawlOutcome> {
    let store: Arc<dyn CatalogStore> = Arc::new(JsonStore::open(&config.storage.data_dir).await?);
    run_crawl_with(config, store, Arc::new(LogMailer), resume).await
}

/// `run_crawl` against caller-supplied storage and mail backends.
pub async fn run_crawl_with(
    config: Arc<Config>,
    store: Arc<dyn CatalogStore>,
    mailer: Arc<dyn Mailer>,
    resume: bool,
) -> Result<CrawlOutcome> {
    let start_time = Utc::now();
    info!("Starting crawl of {}", config.site.root_url);

    let session = if resume {
        CrawlSession::resume(store.as_ref()).await?
    } else {
        CrawlSession::start_fresh(store.as_ref()).await?
    };

    let crawler = CatalogCrawler::new(Arc::clone(&config), Arc::clone(&store), Arc::new(session))?;
    let outcome = crawler.run().await?;

    let mut notifier = Notifier::new(&config, mailer, Arc::clone(&store));
    let report = generate_report(
        store.as_ref(),
        &mut notifier,
        config.report.changelog_limit,
        start_time,
    )
    .await?;

    info!(
        "Run complete in {}s: {} new, {} updated",
        (Utc::now() - start_time).num_seconds(),
        report.new_books,
        report.updated_books,
    );
    Ok(outcome)
}
