//! Pipeline entry points for scraper operations.
//!
//! - `run_catalog_crawl`: Authenticate, paginate the catalog and persist
//!   new-or-changed projects
//! - `diff`: Field-level change detection feeding the upsert gate

pub mod crawl;
pub mod diff;

pub use crawl::{CrawlSummary, IterationStats, run_catalog_crawl};
pub use diff::{FieldChange, ProjectDiff, compare_project, format_change_message};
