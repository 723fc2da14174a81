//! JSON and CSV writers for the `data/` directory

use chrono::NaiveDateTime;
use log::debug;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::config::Mode;
use crate::error::HarvestResult;

/// `{prefix}_{mode}{suffix}_{YYYYmmdd_HHMMSS}.{ext}`
pub fn timestamped_name(
    prefix: &str,
    mode: Mode,
    suffix: &str,
    ext: &str,
    at: NaiveDateTime,
) -> String {
    format!(
        "{prefix}_{mode}{suffix}_{}.{ext}",
        at.format("%Y%m%d_%H%M%S")
    )
}

/// Create the directory holding `path` if needed
pub fn ensure_parent(path: &Path) -> HarvestResult<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Pretty-printed JSON
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> HarvestResult<()> {
    ensure_parent(path)?;
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// CSV with a header row taken from the field names of `T`.
///
/// Nothing is written for an empty slice, since there is no header to infer.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> HarvestResult<()> {
    if rows.is_empty() {
        debug!("No rows for {}, skipping", path.display());
        return Ok(());
    }
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}
