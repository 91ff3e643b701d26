//! CSV export of query results.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tempfile::NamedTempFile;

use crate::connector::QueryResult;

/// Suggested file name for a result exported at `now`, e.g. `result_20240131_154502.csv`.
pub fn default_file_name(now: DateTime<Local>) -> String {
    now.format("result_%Y%m%d_%H%M%S.csv").to_string()
}

/// Writes the header row and every data row to `path`.
///
/// The data goes to a temp file next to `path` first and is renamed into place, so a
/// failure never leaves a half-written file behind.
pub fn write_csv(result: &QueryResult, path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let tmp = NamedTempFile::new_in(&parent)
        .with_context(|| format!("Failed to create temp file in: {}", parent.display()))?;

    let mut writer = csv::Writer::from_writer(tmp);
    writer
        .write_record(&result.columns)
        .context("Failed to write CSV header")?;
    for row in &result.rows {
        writer.write_record(row).context("Failed to write CSV row")?;
    }

    let mut tmp = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV data: {}", e.error()))?;
    tmp.flush().context("Failed to flush CSV file")?;

    tmp.persist(path)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e))?;

    Ok(())
}
