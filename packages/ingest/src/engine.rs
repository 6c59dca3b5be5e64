//! The pagination and resume loop.
//!
//! Partitions are processed strictly in order, pages within a partition in
//! order, and issues within a page one at a time. Nothing is parallelized:
//! the tracker's rate limits are the bottleneck, not local throughput.
//!
//! For each partition, starting from its checkpointed offset:
//!
//! 1. Request the page at the offset.
//! 2. No data or no issue list: abort this partition, move to the next.
//!    The partition still counts as completed for this run; the
//!    [`PartitionOutcome`] in the summary tells the two apart.
//! 3. Empty issue list: the partition is exhausted.
//! 4. Fetch comments, normalize and append each issue.
//! 5. Sync the sink, advance the offset, save the checkpoint.
//! 6. Sleep the inter-page delay.
//! 7. Stop once the offset reaches the reported total, otherwise repeat.
//!
//! A crash between step 4 and step 5 leaves records in the sink that the
//! checkpoint does not cover, so the next run writes them again. Delivery
//! is at-least-once.

use std::sync::Arc;
use std::time::{Duration, Instant};

use issue_scraper_ingest_models::{
    IngestConfig, PartitionOutcome, PartitionReport, RunSummary,
};
use issue_scraper_source::client::IssueClient;
use issue_scraper_source::normalize::normalize_issue;
use issue_scraper_source::retry::{RetryPolicy, RetryingFetcher};
use issue_scraper_source::transport::HttpTransport;

use crate::IngestError;
use crate::checkpoint::CheckpointStore;
use crate::sink::JsonlSink;
use crate::status::StatusTracker;

/// Drives ingestion of every configured partition.
#[derive(Debug)]
pub struct IngestionEngine<T> {
    client: IssueClient<T>,
    checkpoints: CheckpointStore,
    sink: JsonlSink,
    status: Arc<StatusTracker>,
    partitions: Vec<String>,
    page_size: u64,
    inter_page_delay: Duration,
}

/// Clears the running flag when dropped, so the run always ends in the
/// status even if the ingestion task panics or is dropped.
struct RunGuard<'a>(&'a StatusTracker);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.set_running(false);
    }
}

/// Counters for the partition currently being ingested.
#[derive(Debug, Default)]
struct PartitionCursor {
    offset: u64,
    records_written: u64,
}

impl<T: HttpTransport> IngestionEngine<T> {
    /// Builds an engine from `config`, sending requests through `transport`
    /// and reporting to `status`.
    #[must_use]
    pub fn new(config: &IngestConfig, transport: T, status: Arc<StatusTracker>) -> Self {
        let policy = RetryPolicy {
            max_attempts: config.retry_budget,
            rate_limit_cooldown: config.rate_limit_cooldown,
            backoff_base: config.backoff_base,
        };

        Self {
            client: IssueClient::new(&config.api_url, RetryingFetcher::new(transport, policy)),
            checkpoints: CheckpointStore::from_config(config),
            sink: JsonlSink::new(&config.sink_path),
            status,
            partitions: config.partitions.clone(),
            page_size: config.page_size,
            inter_page_delay: config.inter_page_delay,
        }
    }

    /// Claims the run and ingests every partition.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::AlreadyRunning`] if another run is active.
    /// Failures inside the run never surface here; they end the affected
    /// partition as [`PartitionOutcome::Aborted`].
    pub async fn run(&self) -> Result<RunSummary, IngestError> {
        self.status.begin_run()?;
        Ok(self.run_claimed().await)
    }

    /// Ingests every partition of a run already claimed with
    /// [`StatusTracker::begin_run`]. The running flag is cleared on return.
    pub async fn run_claimed(&self) -> RunSummary {
        let _guard = RunGuard(&self.status);
        let started = Instant::now();

        log::info!(
            "Starting ingestion of {} partitions: {}",
            self.partitions.len(),
            self.partitions.join(", ")
        );

        let mut reports = Vec::with_capacity(self.partitions.len());
        for partition in &self.partitions {
            reports.push(self.ingest_partition(partition).await);
        }

        let summary = RunSummary {
            partitions: reports,
            duration: started.elapsed(),
        };
        log::info!(
            "Ingestion complete: {} records written, took {:.1}s",
            summary.records_written(),
            summary.duration.as_secs_f64()
        );
        summary
    }

    /// Ingests one partition from its checkpointed offset.
    pub async fn ingest_partition(&self, partition: &str) -> PartitionReport {
        self.status.set_current_partition(partition);

        let mut cursor = PartitionCursor::default();
        let outcome = match self.paginate(partition, &mut cursor).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("{partition}: aborted at offset {}: {e}", cursor.offset);
                PartitionOutcome::Aborted
            }
        };

        if outcome == PartitionOutcome::Aborted {
            log::warn!(
                "{partition}: aborted, will resume from offset {} next run",
                cursor.offset
            );
        } else {
            log::info!(
                "{partition}: {outcome} at offset {} ({} new records)",
                cursor.offset,
                cursor.records_written
            );
        }
        self.status.mark_completed(partition);

        PartitionReport {
            partition: partition.to_owned(),
            outcome,
            records_written: cursor.records_written,
            offset: cursor.offset,
        }
    }

    async fn paginate(
        &self,
        partition: &str,
        cursor: &mut PartitionCursor,
    ) -> Result<PartitionOutcome, IngestError> {
        let mut checkpoint = self.checkpoints.load()?;
        cursor.offset = checkpoint.offset(partition);

        // The first batch creates the sink; any stale offsets on disk must be
        // gone by then or the next load would trust them.
        if !self.sink.exists() {
            self.checkpoints.save(&checkpoint)?;
        }

        if cursor.offset > 0 {
            log::info!("{partition}: resuming from offset {}", cursor.offset);
        }

        loop {
            let Some(page) = self
                .client
                .search_page(partition, cursor.offset, self.page_size)
                .await
            else {
                log::warn!(
                    "{partition}: skipping empty/malformed response at offset {}",
                    cursor.offset
                );
                return Ok(PartitionOutcome::Aborted);
            };

            if page.issues.is_empty() {
                return Ok(PartitionOutcome::Exhausted);
            }

            let mut batch = self.sink.open_batch()?;
            for issue in &page.issues {
                let comments = match issue.get("key").and_then(serde_json::Value::as_str) {
                    Some(key) => self.client.comments(key).await,
                    None => Vec::new(),
                };
                batch.append(&normalize_issue(issue, comments))?;
            }
            cursor.records_written += batch.commit()?;

            cursor.offset += page.issues.len() as u64;
            checkpoint.set_offset(partition, cursor.offset);
            self.checkpoints.save(&checkpoint)?;

            match page.total {
                Some(total) => log::info!("{partition}: fetched {}/{total}", cursor.offset),
                None => log::info!("{partition}: fetched {}", cursor.offset),
            }

            tokio::time::sleep(self.inter_page_delay).await;

            if let Some(total) = page.total
                && cursor.offset >= total
            {
                return Ok(PartitionOutcome::ReachedTotal);
            }
        }
    }
}
