//! Single-attempt HTTP GET with response classification.
//!
//! A transport performs exactly one request and reports what happened as a
//! [`FetchOutcome`]. It never sleeps and never retries; that is the job of
//! [`RetryingFetcher`](crate::retry::RetryingFetcher).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::SourceError;

/// Result of a single HTTP attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The request succeeded and the body parsed as JSON.
    Success(serde_json::Value),
    /// The resource does not exist (or cannot be served to us). Not an
    /// error: callers treat this as "nothing here".
    Absent,
    /// The attempt failed in a way that is worth retrying.
    Retryable(RetryCause),
}

/// Why an attempt should be retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryCause {
    /// HTTP 429. Retried after a fixed cooldown.
    RateLimited,
    /// HTTP 5xx. Retried with exponential backoff.
    ServerError(u16),
    /// Connection failure, timeout, or body read failure.
    Transport(String),
    /// A 2xx response whose body was not valid JSON.
    Decode(String),
}

impl fmt::Display for RetryCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "HTTP 429 (rate limited)"),
            Self::ServerError(status) => write!(f, "HTTP {status} (server error)"),
            Self::Transport(message) => write!(f, "transport error: {message}"),
            Self::Decode(message) => write!(f, "JSON parse failed: {message}"),
        }
    }
}

/// Coarse classification of an HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx.
    Success,
    /// 404.
    NotFound,
    /// 429.
    RateLimited,
    /// 5xx.
    ServerError,
    /// Anything else (other 4xx, unfollowed 3xx, 1xx).
    Unexpected,
}

/// Classifies a response status for the retry policy.
#[must_use]
pub fn classify_status(status: reqwest::StatusCode) -> StatusClass {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        StatusClass::RateLimited
    } else if status == reqwest::StatusCode::NOT_FOUND {
        StatusClass::NotFound
    } else if status.is_server_error() {
        StatusClass::ServerError
    } else if status.is_success() {
        StatusClass::Success
    } else {
        StatusClass::Unexpected
    }
}

/// Performs one GET request and classifies the result.
///
/// Implementations must be `Send + Sync` so a single transport can be
/// shared by the ingestion task and anything else holding the client.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issues a GET to `url` and returns the classified outcome.
    async fn get_json(&self, url: &str) -> FetchOutcome;
}

/// [`HttpTransport`] backed by a shared [`reqwest::Client`].
///
/// The client (and therefore its connection pool) is reused for every
/// request made through this transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport with a per-attempt `timeout`.
    ///
    /// When `accept_invalid_certs` is set, TLS certificate verification is
    /// disabled. Some public trackers sit behind certificate chains that
    /// rustls rejects; operators who do not need this should turn it off in
    /// the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the client cannot be built.
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> Result<Self, SourceError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get_json(&self, url: &str) -> FetchOutcome {
        log::debug!("GET {url}");

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return FetchOutcome::Retryable(RetryCause::Transport(e.to_string())),
        };

        let status = response.status();
        match classify_status(status) {
            StatusClass::RateLimited => FetchOutcome::Retryable(RetryCause::RateLimited),
            StatusClass::ServerError => {
                FetchOutcome::Retryable(RetryCause::ServerError(status.as_u16()))
            }
            StatusClass::NotFound => {
                log::warn!("404 Not Found: {url}");
                FetchOutcome::Absent
            }
            StatusClass::Unexpected => {
                log::warn!("HTTP {status} from {url}, treating as absent");
                FetchOutcome::Absent
            }
            StatusClass::Success => match response.text().await {
                Ok(text) => match serde_json::from_str(&text) {
                    Ok(value) => FetchOutcome::Success(value),
                    Err(e) => FetchOutcome::Retryable(RetryCause::Decode(e.to_string())),
                },
                Err(e) => FetchOutcome::Retryable(RetryCause::Transport(e.to_string())),
            },
        }
    }
}
