//! Book record structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fields extracted from one book detail page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParsedBook {
    /// Source URL, the record identity
    pub url: String,

    /// Book title
    pub title: String,

    /// Category from the breadcrumb trail
    pub category: String,

    /// Product description, or a fixed placeholder when the page has none
    pub description: String,

    /// Price including tax, currency symbol stripped
    pub price_incl_tax: f64,

    /// Price excluding tax, currency symbol stripped
    pub price_excl_tax: f64,

    /// Units in stock, 0 when the stock string carries no count
    pub availability: u32,

    /// Number of reviews
    pub review_count: u32,

    /// Absolute URL of the cover image
    pub image_url: String,

    /// Star rating 1-5, 0 if unrated or unrecognized
    pub rating: u8,
}

/// A stored book row: the parsed fields plus snapshot bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRecord {
    #[serde(flatten)]
    pub book: ParsedBook,

    /// Hex SHA-256 digest of the raw page body
    pub content_hash: String,

    /// Raw page body snapshot
    pub raw_html: String,

    /// When the record was first created; set exactly once
    pub first_seen: DateTime<Utc>,

    /// When the record last changed
    pub last_updated: DateTime<Utc>,
}

impl BookRecord {
    /// Build a brand-new record; `first_seen` and `last_updated` start equal.
    pub fn new(
        book: ParsedBook,
        content_hash: String,
        raw_html: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            book,
            content_hash,
            raw_html,
            first_seen: now,
            last_updated: now,
        }
    }
}
