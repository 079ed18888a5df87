//! Pipeline entry points for crawl runs.
//!
//! - `run_crawl`: Crawl the catalog, diff against stored state, report
//! - `generate_report`: Summarize and notify one run's changes

pub mod crawl;
pub mod report;

pub use crawl::{run_crawl, run_crawl_with};
pub use report::generate_report;
