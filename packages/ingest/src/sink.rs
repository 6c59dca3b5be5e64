//! Append-only JSON Lines dataset.
//!
//! One [`NormalizedRecord`] per line, UTF-8, never rewritten. Records are
//! written through a [`SinkBatch`] that is flushed and synced to disk before
//! the caller advances its checkpoint.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use issue_scraper_source_models::NormalizedRecord;

use crate::IngestError;

/// The dataset file.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    /// Creates a sink writing to `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the dataset file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the dataset file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Size of the dataset in bytes, or `None` if it does not exist.
    #[must_use]
    pub fn size_bytes(&self) -> Option<u64> {
        std::fs::metadata(&self.path).ok().map(|m| m.len())
    }

    /// Opens the dataset for appending one page of records.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Io`] if the file cannot be opened.
    pub fn open_batch(&self) -> Result<SinkBatch, IngestError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        Ok(SinkBatch {
            writer: BufWriter::new(file),
            written: 0,
        })
    }
}

/// An open append handle for one page of records.
#[derive(Debug)]
pub struct SinkBatch {
    writer: BufWriter<File>,
    written: u64,
}

impl SinkBatch {
    /// Appends one record as a single line.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if serialization or the write fails.
    pub fn append(&mut self, record: &NormalizedRecord) -> Result<(), IngestError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Flushes and syncs the batch, returning how many records it held.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Io`] if the flush or sync fails.
    pub fn commit(mut self) -> Result<u64, IngestError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(self.written)
    }
}
