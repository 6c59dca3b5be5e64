#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ingestion configuration, checkpoint, status, and run summary types.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Default tracker REST API root.
pub const DEFAULT_API_URL: &str = "https://issues.apache.org/jira/rest/api/2";

/// Projects ingested when no override is configured.
pub const DEFAULT_PARTITIONS: &[&str] = &["SPARK", "HADOOP", "KAFKA"];

/// Everything the ingestion core needs to know, injected at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Tracker REST API root.
    pub api_url: String,
    /// Projects to ingest, processed in this order.
    pub partitions: Vec<String>,
    /// Issues requested per search page.
    pub page_size: u64,
    /// Pause after each written page.
    pub inter_page_delay: Duration,
    /// Attempts per HTTP request.
    pub retry_budget: u32,
    /// Wait after an HTTP 429.
    pub rate_limit_cooldown: Duration,
    /// First exponential backoff step.
    pub backoff_base: Duration,
    /// Per-attempt request timeout.
    pub request_timeout: Duration,
    /// Disables TLS certificate verification.
    pub accept_invalid_certs: bool,
    /// Append-only JSON Lines dataset.
    pub sink_path: PathBuf,
    /// Per-partition offsets.
    pub checkpoint_path: PathBuf,
    /// Last-known run status.
    pub status_path: PathBuf,
    /// Output of the flattening transform.
    pub transformed_path: PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            partitions: DEFAULT_PARTITIONS.iter().map(|&p| p.to_owned()).collect(),
            page_size: 10,
            inter_page_delay: Duration::from_secs(1),
            retry_budget: 5,
            rate_limit_cooldown: Duration::from_secs(10),
            backoff_base: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
            accept_invalid_certs: true,
            sink_path: PathBuf::from("output.jsonl"),
            checkpoint_path: PathBuf::from("checkpoint.json"),
            status_path: PathBuf::from("status.json"),
            transformed_path: PathBuf::from("transformed_dataset.jsonl"),
        }
    }
}

/// Persisted mapping from partition to the number of issues already
/// written to the sink.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checkpoint(BTreeMap<String, u64>);

impl Checkpoint {
    /// A checkpoint with every partition at offset zero.
    #[must_use]
    pub fn zeroed<S: AsRef<str>>(partitions: &[S]) -> Self {
        Self(
            partitions
                .iter()
                .map(|p| (p.as_ref().to_owned(), 0))
                .collect(),
        )
    }

    /// Offset of `partition`, zero when it has never been checkpointed.
    #[must_use]
    pub fn offset(&self, partition: &str) -> u64 {
        self.0.get(partition).copied().unwrap_or(0)
    }

    /// Records the offset of `partition`.
    pub fn set_offset(&mut self, partition: &str, offset: u64) {
        self.0.insert(partition.to_owned(), offset);
    }

    /// Ensures every partition in `partitions` has an entry.
    pub fn fill_missing<S: AsRef<str>>(&mut self, partitions: &[S]) {
        for partition in partitions {
            self.0.entry(partition.as_ref().to_owned()).or_insert(0);
        }
    }

    /// Iterates `(partition, offset)` pairs in partition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(p, o)| (p.as_str(), *o))
    }
}

/// In-memory state of the current (or last) ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    /// Whether a run is in progress. At most one run is active at a time.
    pub is_running: bool,
    /// When the active run started.
    pub start_time: Option<DateTime<Utc>>,
    /// Partition the active run is working on.
    pub current_partition: Option<String>,
    /// Partitions finished during the active run, in completion order.
    pub completed_partitions: Vec<String>,
}

/// Progress of one partition as shown in a status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionProgress {
    /// Issues written so far (the checkpointed offset).
    pub scraped: u64,
    /// Whether the partition finished during the current run.
    pub completed: bool,
}

/// Answer to a status query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Whether a run is in progress.
    pub is_running: bool,
    /// When the active run started.
    pub start_time: Option<DateTime<Utc>>,
    /// Partition the active run is working on.
    pub current_partition: Option<String>,
    /// Partitions finished during the current run.
    pub completed_partitions: Vec<String>,
    /// Per-partition progress for every configured partition.
    pub progress: BTreeMap<String, PartitionProgress>,
    /// Raw checkpoint mapping.
    pub checkpoint_state: Checkpoint,
    /// Whether the sink file exists.
    pub sink_exists: bool,
    /// Sink size in bytes (zero when absent).
    pub sink_size_bytes: u64,
    /// Sink size in mebibytes, rounded to two decimals.
    pub sink_size_mb: f64,
}

/// How a partition's pagination loop ended.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PartitionOutcome {
    /// The tracker returned an empty page.
    Exhausted,
    /// The offset reached the total reported by the tracker.
    ReachedTotal,
    /// A page could not be fetched or written; the rest of the run went on.
    Aborted,
}

/// Result of one partition within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionReport {
    /// Partition name.
    pub partition: String,
    /// How the partition's loop ended.
    pub outcome: PartitionOutcome,
    /// Records appended to the sink during this run.
    pub records_written: u64,
    /// Checkpointed offset when the loop ended.
    pub offset: u64,
}

/// Result of a complete run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// One entry per configured partition, in processing order.
    pub partitions: Vec<PartitionReport>,
    /// Wall-clock time the run took.
    pub duration: Duration,
}

impl RunSummary {
    /// Total records appended across all partitions.
    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.partitions.iter().map(|p| p.records_written).sum()
    }
}

/// Result of a reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetReport {
    /// Persisted files that existed and were removed.
    pub files_deleted: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_defaults_missing_partitions_to_zero() {
        let mut checkpoint = Checkpoint::zeroed(&["A"]);
        checkpoint.set_offset("A", 30);
        assert_eq!(checkpoint.offset("A"), 30);
        assert_eq!(checkpoint.offset("B"), 0);

        checkpoint.fill_missing(&["A", "B"]);
        assert_eq!(checkpoint.iter().collect::<Vec<_>>(), vec![("A", 30), ("B", 0)]);
    }

    #[test]
    fn checkpoint_serializes_as_plain_mapping() {
        let mut checkpoint = Checkpoint::default();
        checkpoint.set_offset("KAFKA", 25);
        assert_eq!(
            serde_json::to_string(&checkpoint).unwrap(),
            r#"{"KAFKA":25}"#
        );
        let parsed: Checkpoint = serde_json::from_str(r#"{"SPARK":10}"#).unwrap();
        assert_eq!(parsed.offset("SPARK"), 10);
    }

    #[test]
    fn default_run_status_is_idle() {
        let status = RunStatus::default();
        assert!(!status.is_running);
        assert!(status.start_time.is_none());
        assert!(status.current_partition.is_none());
        assert!(status.completed_partitions.is_empty());
    }

    #[test]
    fn outcome_names_are_screaming_snake_case() {
        assert_eq!(PartitionOutcome::ReachedTotal.to_string(), "REACHED_TOTAL");
        assert_eq!(
            "ABORTED".parse::<PartitionOutcome>().unwrap(),
            PartitionOutcome::Aborted
        );
    }
}
