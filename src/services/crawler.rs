// src/services/crawler.rs

//! Catalog crawl orchestration.
//!
//! Walks the site index into category branches, pages through each branch
//! sequentially and processes the items on a page concurrently. Category
//! branches fail independently; only a dead index page kills the run.

use std::sync::Arc;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::storage::CatalogStore;

use super::detector::{ChangeDetector, Classification};
use super::fetcher::PageFetcher;
use super::parser::PageParser;
use super::session::CrawlSession;

/// Counters for one crawl run.
#[derive(Debug, Default, Clone)]
pub struct CrawlOutcome {
    pub categories: usize,
    pub category_failures: usize,
    pub listing_pages: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl CrawlOutcome {
    fn absorb(&mut self, tally: CrawlOutcome) {
        self.category_failures += tally.category_failures;
        self.listing_pages += tally.listing_pages;
        self.created += tally.created;
        self.updated += tally.updated;
        self.unchanged += tally.unchanged;
        self.skipped += tally.skipped;
        self.failed += tally.failed;
    }

    fn record(&mut self, item: ItemOutcome) {
        match item {
            ItemOutcome::Created => self.created += 1,
            ItemOutcome::Updated => self.updated += 1,
            ItemOutcome::Unchanged => self.unchanged += 1,
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::Failed => self.failed += 1,
        }
    }
}

enum ItemOutcome {
    Created,
    Updated,
    Unchanged,
    Skipped,
    Failed,
}

/// Drives one crawl run over the whole catalog.
pub struct CatalogCrawler {
    config: Arc<Config>,
    fetcher: PageFetcher,
    parser: Arc<PageParser>,
    detector: ChangeDetector,
    session: Arc<CrawlSession>,
}

impl CatalogCrawler {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn CatalogStore>,
        session: Arc<CrawlSession>,
    ) -> Result<Self> {
        let fetcher = PageFetcher::new(&config.crawler)?;
        let parser = Arc::new(PageParser::new(&config.site.root_url)?);
        let detector = ChangeDetector::new(store, Arc::clone(&parser));

        Ok(Self {
            config,
            fetcher,
            parser,
            detector,
            session,
        })
    }

    /// Crawl every category branch of the catalog.
    ///
    /// The only fatal failure is an unreachable index page; everything
    /// below it degrades to per-branch or per-item counters.
    pub async fn run(&self) -> Result<CrawlOutcome> {
        let index_url = self.config.site.index_url();
        let Some(html) = self.fetcher.fetch(&index_url).await else {
            return Err(AppError::crawl(
                "index",
                format!("could not fetch {index_url}"),
            ));
        };

        let categories = self.parser.category_links(&html, &index_url);
        info!("Crawling {} categories from {index_url}", categories.len());

        let mut outcome = CrawlOutcome {
            categories: categories.len(),
            ..CrawlOutcome::default()
        };

        let tallies = join_all(
            categories
                .into_iter()
                .map(|url| self.crawl_category(url)),
        )
        .await;
        for tally in tallies {
            outcome.absorb(tally);
        }

        info!(
            "Crawl finished: {} created, {} updated, {} unchanged, {} skipped, {} failed \
             over {} listing page(s), {} of {} categories abandoned",
            outcome.created,
            outcome.updated,
            outcome.unchanged,
            outcome.skipped,
            outcome.failed,
            outcome.listing_pages,
            outcome.category_failures,
            outcome.categories,
        );
        Ok(outcome)
    }

    /// Page through one category branch, processing each page's items
    /// concurrently before following the pager.
    async fn crawl_category(&self, first_page: String) -> CrawlOutcome {
        let mut tally = CrawlOutcome::default();
        let concurrency = self.config.crawler.max_concurrent.max(1);
        let mut next = Some(first_page);

        while let Some(page_url) = next {
            let Some(html) = self.fetcher.fetch(&page_url).await else {
                warn!("Abandoning category branch at {page_url}");
                tally.category_failures += 1;
                break;
            };
            tally.listing_pages += 1;

            let links = self.parser.book_links(&html, &page_url);
            debug!("{page_url}: {} book link(s)", links.len());

            let mut items = stream::iter(links)
                .map(|link| self.process_item(link))
                .buffer_unordered(concurrency);
            while let Some(item) = items.next().await {
                tally.record(item);
            }

            next = self.parser.next_page(&html, &page_url);
            if let Some(next_url) = &next {
                debug!("Following pager to {next_url}");
            }
        }

        tally
    }

    async fn process_item(&self, url: String) -> ItemOutcome {
        if self.session.is_visited(&url) {
            debug!("Skipping {url}, already processed this session");
            return ItemOutcome::Skipped;
        }

        let Some(body) = self.fetcher.fetch(&url).await else {
            return ItemOutcome::Failed;
        };

        match self.detector.process(&url, &body, &self.session).await {
            Ok(Some(Classification::Created)) => {
                info!("New book: {url}");
                ItemOutcome::Created
            }
            Ok(Some(Classification::Updated)) => {
                info!("Updated book: {url}");
                ItemOutcome::Updated
            }
            Ok(Some(Classification::Unchanged)) => ItemOutcome::Unchanged,
            Ok(None) => ItemOutcome::Skipped,
            Err(e) => {
                warn!("Skipping {url}: {e}");
                ItemOutcome::Failed
            }
        }
    }
}
