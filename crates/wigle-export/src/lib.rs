//! Wigle Export - derived CSV and KML artifacts from stored pages
//!
//! Records are heterogeneous JSON maps, so every export goes through the
//! [`flatten`] projection first: one row per record (or per nested location
//! point) with a column set that is the first-seen union of all keys.
//!
//! # Example
//!
//! ```ignore
//! use wigle_export::{ExportSelection, export_stem};
//!
//! let report = export_stem(&store, &ctx.stem(), ExportSelection::all());
//! if report.any_failed() { /* keep the pages */ }
//! ```

pub mod flatten;
pub mod geo;
pub mod plan;
pub mod tabular;

pub use flatten::{ExportRow, Flattened, RowCoordinates, cell_text, flatten};
pub use geo::{export_kml, placemark_name, write_kml};
pub use plan::{ExportReport, ExportSelection, ExportStatus, export_stem, finalize_pages};
pub use tabular::{export_csv, write_csv};

use std::path::PathBuf;

/// Result of a single export that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// File written with this many rows / placemarks
    Written { path: PathBuf, items: usize },
    /// Nothing qualified; no file was written
    Empty(&'static str),
}
