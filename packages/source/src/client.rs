//! Issue tracker REST client.
//!
//! Wraps a [`RetryingFetcher`] with the two endpoints ingestion needs: the
//! paginated JQL search and the per-issue comment list.

use crate::comments::fetch_comments;
use crate::retry::RetryingFetcher;
use crate::transport::HttpTransport;

/// One page of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    /// Raw issues on this page, in result order.
    pub issues: Vec<serde_json::Value>,
    /// Total number of matching issues, when the tracker reports it.
    pub total: Option<u64>,
}

impl SearchPage {
    /// Parses a search response body.
    ///
    /// Returns `None` when the body has no `issues` array.
    #[must_use]
    pub fn from_response(body: &serde_json::Value) -> Option<Self> {
        let issues = body.get("issues")?.as_array()?.clone();
        let total = body.get("total").and_then(serde_json::Value::as_u64);
        Some(Self { issues, total })
    }
}

/// Builds the search URL for one page of a project.
#[must_use]
pub fn search_url(api_url: &str, partition: &str, start_at: u64, max_results: u64) -> String {
    format!(
        "{}/search?jql=project={partition}&startAt={start_at}&maxResults={max_results}",
        api_url.trim_end_matches('/')
    )
}

/// Client for a tracker's search and comment endpoints.
#[derive(Debug)]
pub struct IssueClient<T> {
    api_url: String,
    fetcher: RetryingFetcher<T>,
}

impl<T: HttpTransport> IssueClient<T> {
    /// Creates a client rooted at `api_url` (e.g.
    /// `https://issues.apache.org/jira/rest/api/2`).
    #[must_use]
    pub fn new(api_url: impl Into<String>, fetcher: RetryingFetcher<T>) -> Self {
        Self {
            api_url: api_url.into(),
            fetcher,
        }
    }

    /// Returns the fetcher used for every request.
    #[must_use]
    pub const fn fetcher(&self) -> &RetryingFetcher<T> {
        &self.fetcher
    }

    /// Fetches the page of `partition` starting at `start_at`.
    ///
    /// Returns `None` when the request yields no data or the response has no
    /// issue list.
    pub async fn search_page(
        &self,
        partition: &str,
        start_at: u64,
        page_size: u64,
    ) -> Option<SearchPage> {
        let url = search_url(&self.api_url, partition, start_at, page_size);
        let body = self.fetcher.fetch(&url).await?;
        let page = SearchPage::from_response(&body);
        if page.is_none() {
            log::warn!("{partition}: search response at offset {start_at} has no issue list");
        }
        page
    }

    /// Fetches the comment bodies of `issue_key`, empty on any failure.
    pub async fn comments(&self, issue_key: &str) -> Vec<String> {
        fetch_comments(&self.fetcher, &self.api_url, issue_key).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn builds_search_url() {
        assert_eq!(
            search_url("https://tracker/rest/api/2", "KAFKA", 20, 10),
            "https://tracker/rest/api/2/search?jql=project=KAFKA&startAt=20&maxResults=10"
        );
    }

    #[test]
    fn parses_page_with_total() {
        let page = SearchPage::from_response(&json!({
            "startAt": 0,
            "total": 25,
            "issues": [{"key": "A-1"}, {"key": "A-2"}],
        }))
        .unwrap();
        assert_eq!(page.issues.len(), 2);
        assert_eq!(page.total, Some(25));
    }

    #[test]
    fn page_without_total_is_still_a_page() {
        let page = SearchPage::from_response(&json!({"issues": []})).unwrap();
        assert!(page.issues.is_empty());
        assert_eq!(page.total, None);
    }

    #[test]
    fn missing_issue_list_is_malformed() {
        assert!(SearchPage::from_response(&json!({"errorMessages": ["bad jql"]})).is_none());
        assert!(SearchPage::from_response(&json!({"issues": {"key": "A-1"}})).is_none());
    }
}
