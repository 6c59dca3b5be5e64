#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API response types for the issue scraper server.
//!
//! Status reports are served as-is from the ingestion models; the types
//! here wrap the remaining operations with a timestamp and message.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use issue_scraper_analytics_models::DatasetStats;
use serde::{Deserialize, Serialize};

/// `GET /` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHome {
    /// Human-readable service banner.
    pub message: String,
    /// Projects this server ingests.
    pub projects: Vec<String>,
}

/// `GET /health` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Always `"healthy"` when the server answers.
    pub status: String,
    /// Server time.
    pub timestamp: DateTime<Utc>,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
}

/// `POST /scrape` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiStarted {
    /// Always `"started"`.
    pub status: String,
    pub message: String,
    /// Projects the run will process, in order.
    pub projects: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// `GET /stats` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiStats {
    pub statistics: DatasetStats,
    pub generated_at: DateTime<Utc>,
}

/// `DELETE /reset` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiReset {
    /// Always `"reset_complete"`.
    pub status: String,
    pub message: String,
    /// Persisted files that existed and were removed.
    pub files_deleted: Vec<PathBuf>,
    pub timestamp: DateTime<Utc>,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// What went wrong.
    pub detail: String,
}

impl ApiError {
    /// Creates an error body.
    #[must_use]
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_serializes_as_detail() {
        let value = serde_json::to_value(ApiError::new("Scraping is already in progress")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"detail": "Scraping is already in progress"})
        );
    }

    #[test]
    fn reset_lists_deleted_paths() {
        let reset = ApiReset {
            status: "reset_complete".to_owned(),
            message: "All checkpoints and data cleared".to_owned(),
            files_deleted: vec![PathBuf::from("checkpoint.json")],
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(reset).unwrap();
        assert_eq!(value["files_deleted"][0], "checkpoint.json");
    }
}
