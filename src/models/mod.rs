// src/models/mod.rs

//! Domain models for the bookwatch application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod book;
mod change;
mod config;
mod report;
mod session;

// Re-export all public types
pub use book::{BookRecord, ParsedBook};
pub use change::{
    AVAILABILITY_FIELD, ChangeEntry, ChangeKind, FieldChange, PRICE_FIELDS,
};
pub use config::{
    Config, CrawlerConfig, NotifyConfig, ReportConfig, SiteConfig, StorageConfig,
};
pub use report::DailyReport;
pub use session::{SessionActivity, new_session_id};
