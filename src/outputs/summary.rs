//! Run summary persistence.

use crate::error::OutputError;
use crate::models::RunSummary;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

pub const SUMMARY_FILENAME: &str = "_normalization_summary.json";

/// Write the run summary to `{output_dir}/_normalization_summary.json`.
///
/// The leading underscore keeps the file out of both the collection-unit
/// discovery and the existing-index scan.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn write_summary(output_dir: &Path, summary: &RunSummary) -> Result<PathBuf, OutputError> {
    let path = output_dir.join(SUMMARY_FILENAME);
    let json = serde_json::to_string_pretty(summary).map_err(|source| OutputError::Json {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, json).await.map_err(|source| OutputError::Io {
        path: path.clone(),
        source,
    })?;
    info!(
        path = %path.display(),
        files_processed = summary.statistics.files_processed,
        articles_normalized = summary.statistics.articles_normalized,
        errors = summary.statistics.errors,
        "Wrote run summary"
    );
    Ok(path)
}
