#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Resumable, rate-limited ingestion of issue tracker data.
//!
//! The [`engine::IngestionEngine`] walks each configured project page by
//! page, enriches every issue with its comments, appends normalized records
//! to the [`sink::JsonlSink`], and checkpoints the offset after every page
//! through the [`checkpoint::CheckpointStore`]. Run state lives in a shared
//! [`status::StatusTracker`]. [`service::IngestService`] bundles these
//! behind the start/status/reset/stats operations that the CLI and the
//! HTTP server call.

pub mod checkpoint;
pub mod config;
pub mod engine;
mod persist;
pub mod service;
pub mod sink;
pub mod status;

use std::path::PathBuf;

use issue_scraper_analytics::AnalyticsError;
use issue_scraper_source::SourceError;

/// Errors that can occur during ingestion and its control operations.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// A run is active, so the requested operation is refused.
    #[error("An ingestion run is already in progress")]
    AlreadyRunning,

    /// The dataset does not exist yet.
    #[error("No data found at {}", .path.display())]
    NoData {
        /// Dataset path that was looked up.
        path: PathBuf,
    },

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration file did not parse.
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Setting up tracker access failed.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Scanning the dataset failed.
    #[error("Analytics error: {0}")]
    Analytics(#[from] AnalyticsError),

    /// The configuration is unusable.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },
}
