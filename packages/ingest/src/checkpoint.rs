//! Durable per-partition offsets.
//!
//! The checkpoint and the sink are co-invariant: no checkpoint may claim
//! progress that the sink does not contain. When the sink is missing, every
//! offset is reported as zero no matter what the checkpoint file says.

use std::path::{Path, PathBuf};

use issue_scraper_ingest_models::{Checkpoint, IngestConfig};

use crate::IngestError;
use crate::persist::write_atomic;

/// Loads and saves the [`Checkpoint`] file.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    checkpoint_path: PathBuf,
    sink_path: PathBuf,
    partitions: Vec<String>,
}

impl CheckpointStore {
    /// Creates a store for `partitions`, guarded by the sink at `sink_path`.
    #[must_use]
    pub fn new(
        checkpoint_path: impl Into<PathBuf>,
        sink_path: impl Into<PathBuf>,
        partitions: Vec<String>,
    ) -> Self {
        Self {
            checkpoint_path: checkpoint_path.into(),
            sink_path: sink_path.into(),
            partitions,
        }
    }

    /// Creates a store from the configured paths and partitions.
    #[must_use]
    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(
            &config.checkpoint_path,
            &config.sink_path,
            config.partitions.clone(),
        )
    }

    /// Path of the checkpoint file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.checkpoint_path
    }

    /// Loads the current offsets.
    ///
    /// Every configured partition is present in the result. If the sink does
    /// not exist, all offsets are zero.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the checkpoint file exists but cannot be
    /// read or parsed.
    pub fn load(&self) -> Result<Checkpoint, IngestError> {
        if !self.sink_path.exists() {
            if self.checkpoint_path.exists() {
                log::info!(
                    "{} is missing, ignoring stale checkpoint {}",
                    self.sink_path.display(),
                    self.checkpoint_path.display()
                );
            }
            return Ok(Checkpoint::zeroed(&self.partitions));
        }

        if !self.checkpoint_path.exists() {
            return Ok(Checkpoint::zeroed(&self.partitions));
        }

        let text = std::fs::read_to_string(&self.checkpoint_path)?;
        let mut checkpoint: Checkpoint = serde_json::from_str(&text)?;
        checkpoint.fill_missing(&self.partitions);
        Ok(checkpoint)
    }

    /// Overwrites the checkpoint file with `checkpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the file cannot be written.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), IngestError> {
        let json = serde_json::to_vec(checkpoint)?;
        write_atomic(&self.checkpoint_path, &json)?;
        Ok(())
    }
}
