#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Read-only scans over the ingested JSON Lines dataset.
//!
//! Both operations stream the file line by line and skip lines that do not
//! parse, so a partially written trailing line never breaks reporting.

pub mod stats;
pub mod transform;

use thiserror::Error;

/// Errors that can occur while scanning the dataset.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Reading the dataset or writing the output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing an output record failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
