//! Control surface over one ingestion workspace.
//!
//! [`IngestService`] owns the shared [`StatusTracker`] and the engine, and
//! exposes the operations the CLI and HTTP layers call: start a run, report
//! status, reset persisted state, and scan the dataset.

use std::collections::BTreeMap;
use std::sync::Arc;

use issue_scraper_analytics::stats::calculate_stats;
use issue_scraper_analytics::transform::transform_dataset;
use issue_scraper_analytics_models::{DatasetStats, TransformReport};
use issue_scraper_ingest_models::{
    Checkpoint, IngestConfig, PartitionProgress, ResetReport, RunStatus, RunSummary, StatusReport,
};
use issue_scraper_source::transport::{HttpTransport, ReqwestTransport};
use tokio::task::JoinHandle;

use crate::IngestError;
use crate::checkpoint::CheckpointStore;
use crate::engine::IngestionEngine;
use crate::persist::remove_if_exists;
use crate::sink::JsonlSink;
use crate::status::StatusTracker;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Ingestion plus its reporting and maintenance operations.
#[derive(Debug)]
pub struct IngestService<T> {
    config: IngestConfig,
    status: Arc<StatusTracker>,
    checkpoints: CheckpointStore,
    sink: JsonlSink,
    engine: Arc<IngestionEngine<T>>,
}

impl IngestService<ReqwestTransport> {
    /// Builds a service that talks to the configured tracker over HTTPS.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Source`] if the HTTP client cannot be built.
    pub fn from_config(config: IngestConfig) -> Result<Self, IngestError> {
        let transport = ReqwestTransport::new(config.request_timeout, config.accept_invalid_certs)?;
        Ok(Self::new(config, transport))
    }
}

impl<T: HttpTransport + 'static> IngestService<T> {
    /// Builds a service sending tracker requests through `transport`.
    #[must_use]
    pub fn new(config: IngestConfig, transport: T) -> Self {
        let status = Arc::new(StatusTracker::new(&config.status_path));
        let engine = IngestionEngine::new(&config, transport, Arc::clone(&status));

        Self {
            checkpoints: CheckpointStore::from_config(&config),
            sink: JsonlSink::new(&config.sink_path),
            status,
            engine: Arc::new(engine),
            config,
        }
    }

    /// The configuration this service was built with.
    #[must_use]
    pub const fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Claims the run and starts ingestion on a background task.
    ///
    /// The run is claimed before this returns, so a status query made right
    /// after sees `is_running: true`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::AlreadyRunning`] if a run is active.
    pub fn start_ingestion(&self) -> Result<JoinHandle<RunSummary>, IngestError> {
        self.status.begin_run()?;
        let engine = Arc::clone(&self.engine);
        Ok(tokio::spawn(async move { engine.run_claimed().await }))
    }

    /// Runs ingestion to completion on the current task.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::AlreadyRunning`] if a run is active.
    pub async fn run_to_completion(&self) -> Result<RunSummary, IngestError> {
        self.engine.run().await
    }

    /// Reports the live run status together with persisted progress.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the checkpoint file cannot be read.
    pub fn status(&self) -> Result<StatusReport, IngestError> {
        self.report_for(self.status.snapshot())
    }

    /// Reports the status last persisted by any process, for callers that
    /// did not run the ingestion themselves.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the status or checkpoint file cannot be
    /// read.
    pub fn last_known_status(&self) -> Result<StatusReport, IngestError> {
        let status = StatusTracker::load_persisted(self.status.path())?.unwrap_or_default();
        self.report_for(status)
    }

    fn report_for(&self, status: RunStatus) -> Result<StatusReport, IngestError> {
        let checkpoint = self.checkpoints.load()?;
        Ok(build_report(
            status,
            checkpoint,
            &self.config.partitions,
            self.sink.size_bytes(),
        ))
    }

    /// Deletes the checkpoint, status, and sink files and restores the idle
    /// status.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::AlreadyRunning`] if a run is active, or
    /// [`IngestError::Io`] if a file exists but cannot be removed.
    pub fn reset(&self) -> Result<ResetReport, IngestError> {
        let paths = [
            self.checkpoints.path(),
            self.status.path(),
            self.sink.path(),
        ];

        let files_deleted = self.status.reset_with(|| {
            let mut deleted = Vec::new();
            for path in paths {
                if remove_if_exists(path)? {
                    log::info!("Deleted {}", path.display());
                    deleted.push(path.to_path_buf());
                }
            }
            Ok(deleted)
        })?;

        Ok(ResetReport { files_deleted })
    }

    /// Aggregate statistics over the dataset.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::NoData`] if the dataset does not exist.
    pub fn stats(&self) -> Result<DatasetStats, IngestError> {
        calculate_stats(self.sink.path())?.ok_or_else(|| IngestError::NoData {
            path: self.sink.path().to_path_buf(),
        })
    }

    /// Flattens the dataset into the configured training file.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::NoData`] if the dataset does not exist.
    pub fn transform(&self) -> Result<TransformReport, IngestError> {
        transform_dataset(self.sink.path(), &self.config.transformed_path)?.ok_or_else(|| {
            IngestError::NoData {
                path: self.sink.path().to_path_buf(),
            }
        })
    }
}

/// Combines a run status with checkpoint and sink facts.
///
/// `progress` has one entry per configured partition; `scraped` is the
/// checkpointed offset and `completed` reflects the current run only.
#[must_use]
pub fn build_report(
    status: RunStatus,
    checkpoint: Checkpoint,
    partitions: &[String],
    sink_size: Option<u64>,
) -> StatusReport {
    let progress: BTreeMap<String, PartitionProgress> = partitions
        .iter()
        .map(|partition| {
            (
                partition.clone(),
                PartitionProgress {
                    scraped: checkpoint.offset(partition),
                    completed: status.completed_partitions.contains(partition),
                },
            )
        })
        .collect();

    let sink_size_bytes = sink_size.unwrap_or(0);
    #[allow(clippy::cast_precision_loss)]
    let sink_size_mb = (sink_size_bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0;

    StatusReport {
        is_running: status.is_running,
        start_time: status.start_time,
        current_partition: status.current_partition,
        completed_partitions: status.completed_partitions,
        progress,
        checkpoint_state: checkpoint,
        sink_exists: sink_size.is_some(),
        sink_size_bytes,
        sink_size_mb,
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use async_trait::async_trait;
    use issue_scraper_source::transport::FetchOutcome;
    use serde_json::json;

    use super::*;

    /// Serves a single project of three issues in one page.
    struct OnePageTracker;

    #[async_trait]
    impl HttpTransport for OnePageTracker {
        async fn get_json(&self, url: &str) -> FetchOutcome {
            if url.contains("/comment") {
                return FetchOutcome::Absent;
            }
            let issues: Vec<_> = (1..=3)
                .map(|i| {
                    json!({
                        "key": format!("X-{i}"),
                        "fields": {
                            "project": {"key": "X"},
                            "status": {"name": "Open"},
                            "created": format!("2024-01-0{i}T00:00:00.000+0000"),
                        }
                    })
                })
                .collect();
            FetchOutcome::Success(json!({"issues": issues, "total": 3}))
        }
    }

    fn config(dir: &Path) -> IngestConfig {
        IngestConfig {
            api_url: "http://tracker".to_owned(),
            partitions: vec!["X".to_owned(), "Y".to_owned()],
            sink_path: dir.join("output.jsonl"),
            checkpoint_path: dir.join("checkpoint.json"),
            status_path: dir.join("status.json"),
            transformed_path: dir.join("transformed.jsonl"),
            ..IngestConfig::default()
        }
    }

    fn service(dir: &Path) -> IngestService<OnePageTracker> {
        IngestService::new(config(dir), OnePageTracker)
    }

    #[test]
    fn report_converts_size_and_progress() {
        let mut checkpoint = Checkpoint::zeroed(&["X", "Y"]);
        checkpoint.set_offset("X", 40);
        let status = RunStatus {
            completed_partitions: vec!["X".to_owned()],
            ..RunStatus::default()
        };

        let report = build_report(
            status,
            checkpoint,
            &["X".to_owned(), "Y".to_owned()],
            Some(3 * 1024 * 1024 + 512 * 1024),
        );

        assert!(report.sink_exists);
        assert!((report.sink_size_mb - 3.5).abs() < f64::EPSILON);
        assert_eq!(
            report.progress["X"],
            PartitionProgress {
                scraped: 40,
                completed: true
            }
        );
        assert_eq!(
            report.progress["Y"],
            PartitionProgress {
                scraped: 0,
                completed: false
            }
        );
    }

    #[test]
    fn idle_status_before_any_run() {
        let dir = tempfile::TempDir::new().unwrap();
        let report = service(dir.path()).status().unwrap();

        assert!(!report.is_running);
        assert!(!report.sink_exists);
        assert_eq!(report.sink_size_bytes, 0);
        assert_eq!(report.checkpoint_state, Checkpoint::zeroed(&["X", "Y"]));
    }

    #[tokio::test(start_paused = true)]
    async fn start_claims_run_before_returning() {
        let dir = tempfile::TempDir::new().unwrap();
        let service = service(dir.path());

        let handle = service.start_ingestion().unwrap();
        assert!(service.status().unwrap().is_running);
        assert!(matches!(
            service.start_ingestion(),
            Err(IngestError::AlreadyRunning)
        ));
        assert!(matches!(service.reset(), Err(IngestError::AlreadyRunning)));

        let summary = handle.await.unwrap();
        assert_eq!(summary.records_written(), 3);

        let report = service.status().unwrap();
        assert!(!report.is_running);
        assert_eq!(report.progress["X"].scraped, 3);
        assert!(report.sink_exists);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_deletes_persisted_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let service = service(dir.path());
        service.run_to_completion().await.unwrap();

        let report = service.reset().unwrap();

        let config = service.config();
        assert_eq!(
            report.files_deleted,
            vec![
                config.checkpoint_path.clone(),
                config.status_path.clone(),
                config.sink_path.clone(),
            ]
        );
        assert_eq!(service.status.snapshot(), RunStatus::default());
        assert!(!config.sink_path.exists());

        assert!(service.reset().unwrap().files_deleted.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn last_known_status_reads_persisted_file() {
        let dir = tempfile::TempDir::new().unwrap();
        service(dir.path()).run_to_completion().await.unwrap();

        let fresh = service(dir.path());
        assert!(fresh.status().unwrap().completed_partitions.is_empty());
        assert_eq!(
            fresh.last_known_status().unwrap().completed_partitions,
            vec!["X", "Y"]
        );
    }

    #[test]
    fn stats_and_transform_need_data() {
        let dir = tempfile::TempDir::new().unwrap();
        let service = service(dir.path());

        assert!(matches!(service.stats(), Err(IngestError::NoData { .. })));
        assert!(matches!(
            service.transform(),
            Err(IngestError::NoData { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn stats_and_transform_after_run() {
        let dir = tempfile::TempDir::new().unwrap();
        let service = service(dir.path());
        service.run_to_completion().await.unwrap();

        let stats = service.stats().unwrap();
        assert_eq!(stats.total_issues, 6);
        assert_eq!(stats.by_project["X"], 6);
        assert_eq!(
            stats.date_range.earliest.as_deref(),
            Some("2024-01-01T00:00:00.000+0000")
        );

        let report = service.transform().unwrap();
        assert_eq!(report.records_written, 6);
        assert!(service.config().transformed_path.exists());
    }
}
