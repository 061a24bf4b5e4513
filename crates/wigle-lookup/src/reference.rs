//! Display projection of reference records

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use wigle_core::{Record, first_present, scalar_text};

pub const REFERENCE_HEADERS: [&str; 5] = ["Country", "Brand", "Operator", "Bands", "Notes"];

/// One operator as shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceRow {
    /// `Name (CC)` when both are known, else whichever is
    pub country: String,
    pub brand: String,
    pub operator: String,
    pub bands: String,
    pub notes: String,
}

impl ReferenceRow {
    pub fn from_record(record: &Record) -> Self {
        let text = |keys: &[&str]| {
            first_present(record, keys)
                .map(scalar_text)
                .unwrap_or_default()
        };
        let name = text(&["countryName", "country"]);
        let code = text(&["countryCode", "cc"]);
        let country = match (name.is_empty(), code.is_empty()) {
            (false, false) => format!("{name} ({code})"),
            (false, true) => name,
            _ => code,
        };
        Self {
            country,
            brand: text(&["brand"]),
            operator: text(&["operator"]),
            bands: text(&["bands"]),
            notes: text(&["notes"]),
        }
    }

    pub fn fields(&self) -> [&str; 5] {
        [
            self.country.as_str(),
            self.brand.as_str(),
            self.operator.as_str(),
            self.bands.as_str(),
            self.notes.as_str(),
        ]
    }
}

/// Write rows as CSV with the fixed reference header.
pub fn write_reference_csv(rows: &[ReferenceRow], path: &Path) -> Result<()> {
    let tmp_path = path.with_extension("csv.tmp");
    let written = (|| -> Result<()> {
        let mut writer = csv::Writer::from_path(&tmp_path)
            .with_context(|| format!("failed to create {}", tmp_path.display()))?;
        writer.write_record(REFERENCE_HEADERS)?;
        for row in rows {
            writer.write_record(row.fields())?;
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
    log::info!("CSV exported: {}", path.display());
    Ok(())
}
