//! Post-fetch export plan: which artifacts to derive and what happens to
//! the raw pages afterwards.

use std::path::PathBuf;

use wigle_store::{RecordStore, delete_files};

use crate::ExportOutcome;
use crate::geo::export_kml;
use crate::tabular::export_csv;

/// Per-run export toggles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSelection {
    pub csv: bool,
    pub kml: bool,
    /// Keep raw JSON instead of deleting the pages after export
    pub keep_json: bool,
}

impl ExportSelection {
    pub fn all() -> Self {
        Self {
            csv: true,
            kml: true,
            keep_json: true,
        }
    }
}

/// What became of one requested export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportStatus {
    NotRequested,
    Written { path: PathBuf, items: usize },
    /// Informational: nothing qualified, no file written
    NothingToExport(&'static str),
    Failed(String),
}

impl ExportStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}

impl std::fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotRequested => f.write_str("-"),
            Self::Written { path, items } => write!(f, "{} ({items})", path.display()),
            Self::NothingToExport(why) => write!(f, "nothing to export ({why})"),
            Self::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub csv: ExportStatus,
    pub kml: ExportStatus,
}

impl ExportReport {
    pub fn any_failed(&self) -> bool {
        self.csv.is_failed() || self.kml.is_failed()
    }
}

/// Run the selected exports over the files stored for `stem`.
///
/// Each export is independent: a failed CSV write does not prevent the KML.
pub fn export_stem(store: &RecordStore, stem: &str, selection: ExportSelection) -> ExportReport {
    let sources = store.source_files(stem);
    let dir = store.dir();

    let csv = if selection.csv {
        settle("CSV", export_csv(&sources, &dir.join(format!("{stem}.csv"))))
    } else {
        ExportStatus::NotRequested
    };
    let kml = if selection.kml {
        settle("KML", export_kml(&sources, &dir.join(format!("{stem}.kml"))))
    } else {
        ExportStatus::NotRequested
    };
    ExportReport { csv, kml }
}

fn settle(label: &str, result: anyhow::Result<ExportOutcome>) -> ExportStatus {
    match result {
        Ok(ExportOutcome::Written { path, items }) => {
            log::info!("{label} exported: {} ({items})", path.display());
            ExportStatus::Written { path, items }
        }
        Ok(ExportOutcome::Empty(why)) => {
            log::info!("{label} export: nothing to export ({why})");
            ExportStatus::NothingToExport(why)
        }
        Err(e) => {
            log::error!("{label} export failed: {e:#}");
            ExportStatus::Failed(format!("{e:#}"))
        }
    }
}

/// Dispose of the raw pages of `stem` once exports are done.
///
/// - `keep_json` with `merge`: pages are merged into `{stem}.json`, then removed.
/// - `keep_json` without `merge`: pages stay as they are.
/// - otherwise the pages are deleted, unless an export failed, in which case
///   they are kept so the run can be re-exported.
///
/// Returns the number of page files removed.
pub fn finalize_pages(
    store: &RecordStore,
    stem: &str,
    selection: ExportSelection,
    report: &ExportReport,
    merge: bool,
) -> usize {
    let pages = store.list_pages(stem);
    if pages.is_empty() {
        return 0;
    }

    if selection.keep_json {
        if !merge {
            return 0;
        }
        return match store.merge(stem, &pages) {
            Ok(merged) => {
                log::info!("Merged RAW JSON saved: {}", merged.display());
                delete_files(&pages)
            }
            Err(e) => {
                log::error!("Failed to merge RAW JSON pages: {e}");
                0
            }
        };
    }

    if report.any_failed() {
        log::warn!(
            "Keeping {} JSON page(s) in {} because an export failed",
            pages.len(),
            store.dir().display()
        );
        return 0;
    }

    let removed = delete_files(&pages);
    log::info!("Cleaned {removed} temporary JSON file(s).");
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use wigle_core::records_from_value;

    fn seeded_store(dir: &std::path::Path) -> RecordStore {
        let store = RecordStore::new(dir);
        store
            .write_page(
                "run",
                1,
                &records_from_value(json!([{"netid": "A", "trilat": 1, "trilong": 2}])),
            )
            .unwrap();
        store
            .write_page("run", 2, &records_from_value(json!([{"netid": "B"}])))
            .unwrap();
        store
    }

    fn remaining(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn export_then_cleanup_leaves_only_exports() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path());
        let selection = ExportSelection {
            csv: true,
            kml: true,
            keep_json: false,
        };

        let report = export_stem(&store, "run", selection);
        assert!(report.csv.is_written());
        assert!(report.kml.is_written());
        assert_eq!(finalize_pages(&store, "run", selection, &report, false), 2);
        assert_eq!(remaining(dir.path()), vec!["run.csv", "run.kml"]);
    }

    #[test]
    fn unrequested_exports_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path());
        let report = export_stem(&store, "run", ExportSelection::default());
        assert_eq!(report.csv, ExportStatus::NotRequested);
        assert_eq!(report.kml, ExportStatus::NotRequested);
    }

    #[test]
    fn keep_json_without_merge_keeps_pages() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path());
        let selection = ExportSelection {
            keep_json: true,
            ..Default::default()
        };
        let report = export_stem(&store, "run", selection);
        assert_eq!(finalize_pages(&store, "run", selection, &report, false), 0);
        assert_eq!(store.list_pages("run").len(), 2);
    }

    #[test]
    fn keep_json_with_merge_collapses_pages() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path());
        let selection = ExportSelection {
            keep_json: true,
            ..Default::default()
        };
        let report = export_stem(&store, "run", selection);
        assert_eq!(finalize_pages(&store, "run", selection, &report, true), 2);
        assert_eq!(remaining(dir.path()), vec!["run.json"]);
    }

    #[test]
    fn failed_export_keeps_pages() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path());
        // A directory where the CSV should go makes the rename fail
        fs::create_dir(dir.path().join("run.csv")).unwrap();
        let selection = ExportSelection {
            csv: true,
            ..Default::default()
        };

        let report = export_stem(&store, "run", selection);
        assert!(report.csv.is_failed());
        assert_eq!(finalize_pages(&store, "run", selection, &report, false), 0);
        assert_eq!(store.list_pages("run").len(), 2);
    }

    #[test]
    fn nothing_to_export_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path());
        store
            .write_page("run", 1, &records_from_value(json!([{"netid": "A"}])))
            .unwrap();
        let selection = ExportSelection {
            kml: true,
            ..Default::default()
        };

        let report = export_stem(&store, "run", selection);
        assert_eq!(
            report.kml,
            ExportStatus::NothingToExport("no points with lat/lon")
        );
        assert_eq!(finalize_pages(&store, "run", selection, &report, false), 1);
        assert!(remaining(dir.path()).is_empty());
    }
}
