//! CSV export

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use wigle_store::load_all;

use crate::ExportOutcome;
use crate::flatten::{Flattened, cell_text, flatten};

/// Flatten the records of `sources` and write them to `path`.
///
/// No source files, or no rows after flattening, is reported as
/// [`ExportOutcome::Empty`] and writes nothing.
pub fn export_csv(sources: &[PathBuf], path: &Path) -> Result<ExportOutcome> {
    if sources.is_empty() {
        return Ok(ExportOutcome::Empty("no JSON pages"));
    }
    let flat = flatten(&load_all(sources));
    write_csv(&flat, path)
}

/// Header row = column union, then one line per row; absent fields are empty.
pub fn write_csv(flat: &Flattened, path: &Path) -> Result<ExportOutcome> {
    if flat.is_empty() || flat.columns.is_empty() {
        return Ok(ExportOutcome::Empty("no rows"));
    }

    let tmp_path = path.with_extension("csv.tmp");
    let written = (|| -> Result<()> {
        let mut writer = csv::Writer::from_path(&tmp_path)
            .with_context(|| format!("failed to create {}", tmp_path.display()))?;
        writer.write_record(&flat.columns)?;
        for row in &flat.rows {
            writer.write_record(flat.columns.iter().map(|c| cell_text(row.get(c))))?;
        }
        writer.flush()?;
        Ok(())
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    fs::rename(&tmp_path, path)
        .with_context(|| format!("failed to rename {} → {}", tmp_path.display(), path.display()))?;

    Ok(ExportOutcome::Written {
        path: path.to_path_buf(),
        items: flat.rows.len(),
    })
}
