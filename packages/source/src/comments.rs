//! Per-issue comment enrichment.
//!
//! Comments live behind a separate endpoint per issue. Missing issues,
//! exhausted retries and payloads without a `comments` array all produce an
//! empty list, so a comment failure never costs the issue itself.

use crate::retry::RetryingFetcher;
use crate::transport::HttpTransport;

/// Builds the comment endpoint URL for `issue_key`.
#[must_use]
pub fn comments_url(api_url: &str, issue_key: &str) -> String {
    format!("{}/issue/{issue_key}/comment", api_url.trim_end_matches('/'))
}

/// Extracts comment bodies from a comment endpoint payload.
///
/// Comments without a non-empty string `body` are dropped; the remaining
/// bodies are trimmed and kept in discussion order.
#[must_use]
pub fn extract_comment_bodies(payload: &serde_json::Value) -> Vec<String> {
    let Some(comments) = payload
        .get("comments")
        .and_then(serde_json::Value::as_array)
    else {
        return Vec::new();
    };

    comments
        .iter()
        .filter_map(|comment| comment.get("body").and_then(serde_json::Value::as_str))
        .filter(|body| !body.is_empty())
        .map(|body| body.trim().to_owned())
        .collect()
}

/// Fetches the comment bodies of one issue.
///
/// Never fails: absence of any kind yields an empty list.
pub async fn fetch_comments<T: HttpTransport>(
    fetcher: &RetryingFetcher<T>,
    api_url: &str,
    issue_key: &str,
) -> Vec<String> {
    let url = comments_url(api_url, issue_key);
    match fetcher.fetch(&url).await {
        Some(payload) => extract_comment_bodies(&payload),
        None => {
            log::debug!("{issue_key}: no comments available");
            Vec::new()
        }
    }
}
