// src/lib.rs

//! Irisbot: Iris catalog scraper library.
//!
//! Logs into the Iris real-estate platform, drives the dynamically-loaded
//! project catalog through its "load more" pagination, extracts structured
//! records from the visible cards and persists only meaningful deltas into
//! SQLite with an auditable new/updated/unchanged classification.

pub mod browser;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
