//! Storage layer for project persistence.
//!
//! A single SQLite table `projects`, keyed by the numeric project ID with a
//! unique detail URL. Writes go through an atomic insert-or-update so
//! re-scrapes are naturally idempotent.

pub mod sqlite;

// Re-export for convenience
pub use sqlite::{ProjectStore, StoreStats};
