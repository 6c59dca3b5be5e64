//! Aggregate statistics over the dataset.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead as _, BufReader};
use std::path::Path;

use issue_scraper_analytics_models::DatasetStats;
use serde::Deserialize;

use crate::AnalyticsError;

/// The subset of a record the statistics look at. Every field is optional
/// so records written by older versions still count.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatsLine {
    metadata: Option<StatsMetadata>,
    content: Option<StatsContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatsMetadata {
    project: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    created: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatsContent {
    comments: Option<Vec<serde_json::Value>>,
}

/// Computes statistics over the dataset at `path` with a full scan.
///
/// Returns `Ok(None)` when the file does not exist, which callers report
/// as "no data" rather than as empty statistics.
///
/// # Errors
///
/// Returns [`AnalyticsError::Io`] if the file exists but cannot be read.
pub fn calculate_stats(path: &Path) -> Result<Option<DatasetStats>, AnalyticsError> {
    if !path.exists() {
        return Ok(None);
    }

    let reader = BufReader::new(File::open(path)?);
    let mut stats = DatasetStats::default();
    let mut skipped: u64 = 0;

    for line in reader.lines() {
        let line = line?;
        let Ok(record) = serde_json::from_str::<StatsLine>(&line) else {
            skipped += 1;
            continue;
        };
        accumulate(&mut stats, record);
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} unparseable lines in {}", path.display());
    }

    Ok(Some(stats))
}

fn accumulate(stats: &mut DatasetStats, record: StatsLine) {
    stats.total_issues += 1;

    let metadata = record.metadata.unwrap_or_default();
    bump(&mut stats.by_project, metadata.project);
    bump(&mut stats.by_status, metadata.status);
    bump(&mut stats.by_priority, metadata.priority);

    if let Some(created) = metadata.created.as_deref().filter(|c| !c.is_empty()) {
        stats.date_range.include(created);
    }

    let comments = record
        .content
        .and_then(|c| c.comments)
        .map_or(0, |c| c.len() as u64);
    stats.total_comments += comments;
    if comments > 0 {
        stats.issues_with_comments += 1;
    }
}

fn bump(counts: &mut BTreeMap<String, u64>, key: Option<String>) {
    if let Some(key) = key.filter(|k| !k.is_empty()) {
        *counts.entry(key).or_insert(0) += 1;
    }
}
