//! Service layer for the bookwatch application.
//!
//! This module contains the business logic for:
//! - Page fetching (`PageFetcher`)
//! - HTML extraction (`PageParser`)
//! - Change detection (`ChangeDetector`)
//! - Crawl orchestration (`CatalogCrawler`)
//! - Session bookkeeping (`CrawlSession`)
//! - Notification dispatch (`Notifier`)

mod crawler;
mod detector;
mod fetcher;
mod notifier;
mod parser;
mod session;

pub use crawler::{CatalogCrawler, CrawlOutcome};
pub use detector::{ChangeDetector, Classification, diff_books};
pub use fetcher::PageFetcher;
pub use notifier::{LogMailer, MailMessage, MailQuota, Mailer, Notifier};
pub use parser::PageParser;
pub use session::CrawlSession;
