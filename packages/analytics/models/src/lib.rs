#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dataset statistics and transform result types.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Aggregate counts over every record in the dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetStats {
    /// Number of parseable records.
    pub total_issues: u64,
    /// Record count per project key.
    pub by_project: BTreeMap<String, u64>,
    /// Record count per workflow status.
    pub by_status: BTreeMap<String, u64>,
    /// Record count per priority.
    pub by_priority: BTreeMap<String, u64>,
    /// Earliest and latest creation timestamps.
    pub date_range: DateRange,
    /// Sum of comment counts.
    pub total_comments: u64,
    /// Records with at least one comment.
    pub issues_with_comments: u64,
}

/// Span of issue creation timestamps, compared as ISO 8601 strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Earliest `created` value seen.
    pub earliest: Option<String>,
    /// Latest `created` value seen.
    pub latest: Option<String>,
}

impl DateRange {
    /// Widens the range to include `created`.
    pub fn include(&mut self, created: &str) {
        if self.earliest.as_deref().is_none_or(|e| created < e) {
            self.earliest = Some(created.to_owned());
        }
        if self.latest.as_deref().is_none_or(|l| created > l) {
            self.latest = Some(created.to_owned());
        }
    }
}

/// Result of flattening the dataset into a training file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformReport {
    /// Where the flattened dataset was written.
    pub output_path: PathBuf,
    /// Records written.
    pub records_written: u64,
    /// Lines skipped because they were not valid JSON.
    pub lines_skipped: u64,
}
