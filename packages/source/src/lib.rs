#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Issue tracker access and record normalization.
//!
//! Every HTTP request goes through a [`transport::HttpTransport`], which
//! classifies each response into a [`transport::FetchOutcome`]. The
//! [`retry::RetryingFetcher`] turns those outcomes into a bounded retry
//! loop, and [`client::IssueClient`] builds the search and comment
//! endpoints on top of it. [`normalize`] maps a raw issue plus its
//! comments into the canonical
//! [`NormalizedRecord`](issue_scraper_source_models::NormalizedRecord).

pub mod client;
pub mod comments;
pub mod normalize;
pub mod retry;
pub mod transport;

/// Errors that can occur while setting up issue tracker access.
///
/// Request-level failures never surface as this type: they are reported
/// through [`transport::FetchOutcome`] and absorbed by the retry loop.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Building the HTTP client failed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}
