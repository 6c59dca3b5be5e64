//! Flattens the dataset into a compact training file.

use std::fs::File;
use std::io::{BufRead as _, BufReader, BufWriter, Write as _};
use std::path::Path;

use issue_scraper_analytics_models::TransformReport;

use crate::AnalyticsError;

/// Re-serializes every record of `sink_path` as one compact JSON object per
/// line into `output_path`, overwriting it.
///
/// Returns `Ok(None)` when the dataset does not exist.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if reading the dataset or writing the output
/// fails.
pub fn transform_dataset(
    sink_path: &Path,
    output_path: &Path,
) -> Result<Option<TransformReport>, AnalyticsError> {
    if !sink_path.exists() {
        return Ok(None);
    }

    let reader = BufReader::new(File::open(sink_path)?);
    let mut writer = BufWriter::new(File::create(output_path)?);
    let mut records_written: u64 = 0;
    let mut lines_skipped: u64 = 0;

    for line in reader.lines() {
        let line = line?;
        match serde_json::from_str::<serde_json::Value>(&line) {
            Ok(record) => {
                serde_json::to_writer(&mut writer, &record)?;
                writer.write_all(b"\n")?;
                records_written += 1;
            }
            Err(e) => {
                log::warn!("Skipping unparseable line: {e}");
                lines_skipped += 1;
            }
        }
    }
    writer.flush()?;

    log::info!(
        "Transformed {records_written} records into {}",
        output_path.display()
    );

    Ok(Some(TransformReport {
        output_path: output_path.to_path_buf(),
        records_written,
        lines_skipped,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_dataset_is_none() {
        let dir = tempfile::TempDir::new().unwrap();
        let report = transform_dataset(
            &dir.path().join("output.jsonl"),
            &dir.path().join("flat.jsonl"),
        )
        .unwrap();
        assert!(report.is_none());
        assert!(!dir.path().join("flat.jsonl").exists());
    }

    #[test]
    fn compacts_records_and_skips_garbage() {
        let dir = tempfile::TempDir::new().unwrap();
        let sink = dir.path().join("output.jsonl");
        let out = dir.path().join("flat.jsonl");
        std::fs::write(
            &sink,
            "{ \"metadata\": { \"key\": \"A-1\" } }\n{truncated\n{\"metadata\":{\"key\":\"A-2\"}}\n",
        )
        .unwrap();

        let report = transform_dataset(&sink, &out).unwrap().unwrap();

        assert_eq!(report.records_written, 2);
        assert_eq!(report.lines_skipped, 1);
        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            "{\"metadata\":{\"key\":\"A-1\"}}\n{\"metadata\":{\"key\":\"A-2\"}}\n"
        );
    }
}
