//! Bounded retry loop over an [`HttpTransport`].
//!
//! All tracker requests go through [`RetryingFetcher::fetch`]. Each call
//! makes at most [`RetryPolicy::max_attempts`] attempts:
//!
//! * HTTP 429 waits a fixed [`RetryPolicy::rate_limit_cooldown`] (10s by
//!   default) and consumes one attempt.
//! * HTTP 5xx, transport errors and undecodable bodies wait
//!   `backoff_base * 2^attempt` (1s, 2s, 4s, 8s with the defaults).
//! * HTTP 404 (and other non-retryable statuses) return `None` at once.
//! * Running out of attempts returns `None`. Callers treat that as a soft
//!   failure; nothing above this layer sees an error.
//!
//! # Usage
//!
//! ```ignore
//! let fetcher = RetryingFetcher::new(transport, RetryPolicy::default());
//! if let Some(body) = fetcher.fetch(&url).await {
//!     // ...
//! }
//! ```

use std::time::Duration;

use crate::transport::{FetchOutcome, HttpTransport, RetryCause};

/// Default number of attempts per request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default wait after an HTTP 429.
pub const DEFAULT_RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(10);

/// Default base of the exponential backoff.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// How many times to try a request and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first. Must be at least 1.
    pub max_attempts: u32,
    /// Fixed wait after a rate-limited response.
    pub rate_limit_cooldown: Duration,
    /// Wait after the first failed attempt; doubles on each further attempt.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rate_limit_cooldown: DEFAULT_RATE_LIMIT_COOLDOWN,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff after the zero-indexed `attempt` failed.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Wait before the next attempt after a failure caused by `cause`.
    #[must_use]
    pub fn delay_for(&self, cause: &RetryCause, attempt: u32) -> Duration {
        match cause {
            RetryCause::RateLimited => self.rate_limit_cooldown,
            RetryCause::ServerError(_) | RetryCause::Transport(_) | RetryCause::Decode(_) => {
                self.backoff(attempt)
            }
        }
    }
}

/// Issues GET requests through a transport, retrying transient failures.
#[derive(Debug)]
pub struct RetryingFetcher<T> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: HttpTransport> RetryingFetcher<T> {
    /// Wraps `transport` with the given retry `policy`.
    #[must_use]
    pub const fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Returns the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetches `url` and returns its JSON body.
    ///
    /// Returns `None` for absent resources and when every attempt failed.
    /// No sleep follows the final attempt.
    pub async fn fetch(&self, url: &str) -> Option<serde_json::Value> {
        let max_attempts = self.policy.max_attempts;

        for attempt in 0..max_attempts {
            let cause = match self.transport.get_json(url).await {
                FetchOutcome::Success(value) => return Some(value),
                FetchOutcome::Absent => return None,
                FetchOutcome::Retryable(cause) => cause,
            };

            if attempt + 1 == max_attempts {
                log::warn!("  attempt {}/{max_attempts} failed: {cause}", attempt + 1);
                break;
            }

            let delay = self.policy.delay_for(&cause, attempt);
            log::warn!(
                "  attempt {}/{max_attempts} failed: {cause}, retrying in {delay:?}...",
                attempt + 1
            );
            tokio::time::sleep(delay).await;
        }

        log::error!("Giving up on {url} after {max_attempts} attempts");
        None
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::time::Instant;

    use super::*;

    /// Replays a fixed list of outcomes, one per request.
    struct ScriptedTransport {
        outcomes: Mutex<VecDeque<FetchOutcome>>,
        requests: Mutex<u32>,
    }

    impl ScriptedTransport {
        fn new(outcomes: Vec<FetchOutcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                requests: Mutex::new(0),
            }
        }

        fn requests(&self) -> u32 {
            *self.requests.lock().unwrap()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn get_json(&self, _url: &str) -> FetchOutcome {
            *self.requests.lock().unwrap() += 1;
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("script exhausted")
        }
    }

    fn server_error() -> FetchOutcome {
        FetchOutcome::Retryable(RetryCause::ServerError(500))
    }

    #[test]
    fn backoff_doubles_from_base() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(4), Duration::from_secs(16));
    }

    #[test]
    fn rate_limit_uses_fixed_cooldown() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_for(&RetryCause::RateLimited, 3),
            Duration::from_secs(10)
        );
        assert_eq!(
            policy.delay_for(&RetryCause::Transport("reset".to_owned()), 3),
            Duration::from_secs(8)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn server_errors_then_success_returns_payload() {
        let transport = ScriptedTransport::new(vec![
            server_error(),
            server_error(),
            FetchOutcome::Success(json!({"ok": true})),
        ]);
        let fetcher = RetryingFetcher::new(transport, RetryPolicy::default());

        let started = Instant::now();
        let body = fetcher.fetch("http://tracker/x").await;

        assert_eq!(body, Some(json!({"ok": true})));
        assert_eq!(fetcher.transport().requests(), 3);
        // 1s + 2s of backoff.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_and_decode_failures_back_off_then_succeed() {
        let transport = ScriptedTransport::new(vec![
            FetchOutcome::Retryable(RetryCause::Transport("connection reset".to_owned())),
            FetchOutcome::Retryable(RetryCause::Decode("expected value".to_owned())),
            FetchOutcome::Success(json!({"issues": []})),
        ]);
        let fetcher = RetryingFetcher::new(transport, RetryPolicy::default());

        let started = Instant::now();
        let body = fetcher.fetch("http://tracker/x").await;

        assert_eq!(body, Some(json!({"issues": []})));
        assert_eq!(fetcher.transport().requests(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausting_budget_returns_none() {
        let transport = ScriptedTransport::new(vec![server_error(); 5]);
        let fetcher = RetryingFetcher::new(transport, RetryPolicy::default());

        let started = Instant::now();
        assert_eq!(fetcher.fetch("http://tracker/x").await, None);
        assert_eq!(fetcher.transport().requests(), 5);
        // 1 + 2 + 4 + 8, no sleep after the last attempt.
        assert_eq!(started.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_is_absent_without_retry() {
        let transport = ScriptedTransport::new(vec![FetchOutcome::Absent]);
        let fetcher = RetryingFetcher::new(transport, RetryPolicy::default());

        assert_eq!(fetcher.fetch("http://tracker/missing").await, None);
        assert_eq!(fetcher.transport().requests(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_consumes_an_attempt_and_waits_cooldown() {
        let transport = ScriptedTransport::new(vec![
            FetchOutcome::Retryable(RetryCause::RateLimited),
            FetchOutcome::Retryable(RetryCause::RateLimited),
            FetchOutcome::Success(json!([])),
        ]);
        let policy = RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        };
        let fetcher = RetryingFetcher::new(transport, policy);

        let started = Instant::now();
        assert_eq!(fetcher.fetch("http://tracker/x").await, Some(json!([])));
        assert_eq!(started.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limits_count_against_the_budget() {
        let transport =
            ScriptedTransport::new(vec![FetchOutcome::Retryable(RetryCause::RateLimited); 2]);
        let policy = RetryPolicy {
            max_attempts: 2,
            ..RetryPolicy::default()
        };
        let fetcher = RetryingFetcher::new(transport, policy);

        assert_eq!(fetcher.fetch("http://tracker/x").await, None);
        assert_eq!(fetcher.transport().requests(), 2);
    }
}
