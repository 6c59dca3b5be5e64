//! Shared run status.
//!
//! One [`StatusTracker`] is shared (behind an `Arc`) by the ingestion task
//! and every reporting caller. Each mutation rewrites the status file so a
//! restarted reporting process can show the last-known state.
//!
//! A process that dies mid-run leaves `is_running: true` in the status
//! file. Nothing repairs that automatically; a fresh tracker always starts
//! idle in memory and only [`StatusTracker::load_persisted`] sees the stale
//! flag.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use issue_scraper_ingest_models::RunStatus;

use crate::IngestError;
use crate::persist::write_atomic;

/// Owns the [`RunStatus`] and its persisted copy.
#[derive(Debug)]
pub struct StatusTracker {
    status: Mutex<RunStatus>,
    path: PathBuf,
}

impl StatusTracker {
    /// Creates an idle tracker persisting to `path`.
    ///
    /// The file is not read; in-memory state always starts idle.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            status: Mutex::new(RunStatus::default()),
            path: path.into(),
        }
    }

    /// Path of the persisted status file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a copy of the current status.
    #[must_use]
    pub fn snapshot(&self) -> RunStatus {
        self.lock().clone()
    }

    /// Sets the running flag.
    ///
    /// Setting it resets `start_time` to now and clears the completed
    /// list; clearing it drops `current_partition` and `start_time`.
    pub fn set_running(&self, running: bool) {
        let mut status = self.lock();
        apply_running(&mut status, running);
        self.persist(&status);
    }

    /// Atomically claims the run: fails if one is already active, otherwise
    /// behaves like `set_running(true)`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::AlreadyRunning`] if a run is active.
    pub fn begin_run(&self) -> Result<(), IngestError> {
        let mut status = self.lock();
        if status.is_running {
            return Err(IngestError::AlreadyRunning);
        }
        apply_running(&mut status, true);
        self.persist(&status);
        Ok(())
    }

    /// Records the partition the run is working on.
    pub fn set_current_partition(&self, partition: &str) {
        let mut status = self.lock();
        status.current_partition = Some(partition.to_owned());
        self.persist(&status);
    }

    /// Adds `partition` to the completed list unless already present.
    pub fn mark_completed(&self, partition: &str) {
        let mut status = self.lock();
        if !status.completed_partitions.iter().any(|p| p == partition) {
            status.completed_partitions.push(partition.to_owned());
        }
        self.persist(&status);
    }

    /// Runs `cleanup` and restores the idle status, refusing while a run is
    /// active. The status lock is held throughout, so no run can start
    /// halfway through.
    ///
    /// The status file is not rewritten; `cleanup` is expected to remove
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::AlreadyRunning`] if a run is active, or
    /// whatever `cleanup` returns.
    pub fn reset_with<T>(
        &self,
        cleanup: impl FnOnce() -> Result<T, IngestError>,
    ) -> Result<T, IngestError> {
        let mut status = self.lock();
        if status.is_running {
            return Err(IngestError::AlreadyRunning);
        }
        let result = cleanup()?;
        *status = RunStatus::default();
        Ok(result)
    }

    /// Reads the last persisted status, if any.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load_persisted(path: &Path) -> Result<Option<RunStatus>, IngestError> {
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn lock(&self) -> MutexGuard<'_, RunStatus> {
        self.status
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn persist(&self, status: &RunStatus) {
        let result = serde_json::to_vec_pretty(status)
            .map_err(IngestError::from)
            .and_then(|json| write_atomic(&self.path, &json).map_err(IngestError::from));
        if let Err(e) = result {
            log::warn!("Failed to persist status to {}: {e}", self.path.display());
        }
    }
}

fn apply_running(status: &mut RunStatus, running: bool) {
    status.is_running = running;
    if running {
        status.start_time = Some(chrono::Utc::now());
        status.completed_partitions.clear();
    } else {
        status.start_time = None;
        status.current_partition = None;
    }
}
