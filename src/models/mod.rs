// src/models/mod.rs

//! Domain models for the scraper application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod project;
mod selectors;

// Re-export all public types
pub use config::{
    AuthConfig, BrowserConfig, Config, DownloadConfig, PaginationConfig, ScrollConfig,
    StorageConfig, UrlsConfig,
};
pub use project::{ProjectEntity, ProjectRecord};
pub use selectors::{
    AuthSelectors, CatalogSelectors, DeliverySelectors, GridSelectors, ListSelectors,
    LoadMoreStrategy, TableSelectors,
};
