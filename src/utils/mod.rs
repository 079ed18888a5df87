//! Utility functions and helpers.

pub mod retry;

use sha2::{Digest, Sha256};
use url::Url;

/// Resolve an extracted href to an absolute URL.
///
/// Fragment-only links and `javascript:` pseudo-links are discarded. The
/// href is joined against the current page URL; when that is not itself an
/// absolute URL, the configured site root is the fallback base. If no base
/// parses, the href is returned untouched.
pub fn resolve_url(href: &str, current_url: &str, site_root: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }

    let base = Url::parse(current_url)
        .or_else(|_| Url::parse(site_root))
        .ok();
    match base {
        Some(base) => Some(
            base.join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string()),
        ),
        None => Some(href.to_string()),
    }
}

/// SHA-256 hex digest of a raw page body.
pub fn content_hash(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    hex::encode(hasher.finalize())
}
