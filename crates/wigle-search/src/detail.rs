//! Single-request detail lookups keyed by network id or cell identity

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use wigle_core::{
    ApiClient, ApiError, CancellationToken, Record, first_present, location_points, parse_body,
    scalar_text, should_stop,
};
use wigle_export::{ExportReport, ExportSelection, export_stem, finalize_pages};
use wigle_store::{RecordStore, sanitize_basename};

use crate::category::DetailKind;
use crate::params::SearchParameters;

/// Cell identity keys, in basename and device-id order.
const CELL_ID_KEYS: [&str; 6] = ["operator", "lac", "cid", "system", "network", "basestation"];

const NAME_FIELDS: [&str; 3] = ["ssid", "name", "operator"];

/// File-safe name for one lookup: the netid without colons, else the cell
/// identity as `operator-<v>_lac-<v>...`, else `detail`.
pub fn detail_basename(params: &SearchParameters) -> String {
    let raw = match params.get("netid") {
        Some(netid) => netid.to_string(),
        None => {
            let parts: Vec<String> = CELL_ID_KEYS
                .iter()
                .filter_map(|k| params.get(k).map(|v| format!("{k}-{v}")))
                .collect();
            if parts.is_empty() {
                "detail".to_string()
            } else {
                parts.join("_")
            }
        }
    };
    sanitize_basename(&raw)
}

/// Network ids of a batch file: one per line, blank lines and `#`
/// comments skipped.
pub fn parse_batch(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read a batch file; an unreadable or empty file is a configuration error.
pub fn read_batch_file(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read batch file {}", path.display()))?;
    let ids = parse_batch(&text);
    if ids.is_empty() {
        bail!("no network ids found in {}", path.display());
    }
    Ok(ids)
}

/// Records of a detail response: `results`, else the lone `result`.
pub fn detail_records(data: &Value) -> Vec<Record> {
    let results: Vec<Record> = data
        .get("results")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_object).cloned().collect())
        .unwrap_or_default();
    if !results.is_empty() {
        return results;
    }
    match data.get("result") {
        Some(Value::Object(result)) if !result.is_empty() => vec![result.clone()],
        _ => Vec::new(),
    }
}

/// Identifier shown in the live view.
pub fn device_id(record: &Record) -> String {
    if let Some(netid) = first_present(record, &["netid"]) {
        return scalar_text(netid);
    }
    let parts: Vec<String> = CELL_ID_KEYS
        .iter()
        .filter_map(|k| first_present(record, &[*k]).map(|v| format!("{k}={}", scalar_text(v))))
        .collect();
    if parts.is_empty() {
        "(unknown)".to_string()
    } else {
        parts.join(";")
    }
}

pub fn display_name(record: &Record) -> String {
    first_present(record, &NAME_FIELDS)
        .map(scalar_text)
        .unwrap_or_default()
}

/// One observed location of a looked-up device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRow {
    pub device_id: String,
    pub name: String,
    pub lat: String,
    pub lon: String,
    pub time: String,
}

/// Live-view rows: one per location point with coordinates.
pub fn detail_rows(records: &[Record]) -> Vec<DetailRow> {
    let mut rows = Vec::new();
    for record in records {
        let id = device_id(record);
        let name = display_name(record);
        for point in location_points(record) {
            let (lat, lon) = point.display_coords();
            rows.push(DetailRow {
                device_id: id.clone(),
                name: name.clone(),
                lat,
                lon,
                time: point.time.unwrap_or_default(),
            });
        }
    }
    rows
}

/// Issue one detail request. A body that is not JSON yields no records.
pub async fn fetch_detail(
    client: &ApiClient,
    kind: DetailKind,
    params: &SearchParameters,
    timeout: Duration,
) -> Result<Vec<Record>, ApiError> {
    log::info!("Submitted: {}", client.describe(kind.path(), params.as_query()));
    let body = client.get_text(kind.path(), params.as_query(), timeout).await?;
    Ok(parse_body(&body)
        .map(|data| detail_records(&data))
        .unwrap_or_default())
}

/// Result of one detail lookup.
#[derive(Debug)]
pub struct DetailOutcome {
    pub basename: String,
    pub records: usize,
    pub rows: Vec<DetailRow>,
    pub saved: Option<PathBuf>,
    /// `None` when the lookup failed or returned nothing
    pub exports: Option<ExportReport>,
    pub error: Option<String>,
}

impl DetailOutcome {
    fn empty(basename: String) -> Self {
        Self {
            basename,
            records: 0,
            rows: Vec::new(),
            saved: None,
            exports: None,
            error: None,
        }
    }

    pub fn csv_written(&self) -> bool {
        self.exports.as_ref().is_some_and(|r| r.csv.is_written())
    }

    pub fn kml_written(&self) -> bool {
        self.exports.as_ref().is_some_and(|r| r.kml.is_written())
    }
}

/// Where and how detail lookups run.
#[derive(Debug, Clone)]
pub struct DetailTarget<'a> {
    pub client: &'a ApiClient,
    pub kind: DetailKind,
    pub store: RecordStore,
    pub selection: ExportSelection,
    pub timeout: Duration,
}

impl DetailTarget<'_> {
    /// Look up one device, store its records as `{basename}-page_1.json`,
    /// then export and dispose of the page per the export selection.
    ///
    /// Failures are logged and recorded in the outcome, never propagated.
    pub async fn lookup(&self, params: &SearchParameters) -> DetailOutcome {
        let mut outcome = DetailOutcome::empty(detail_basename(params));

        let records = match fetch_detail(self.client, self.kind, params, self.timeout).await {
            Ok(records) => records,
            Err(e) => {
                log::error!("Detail request failed: {e}");
                outcome.error = Some(e.to_string());
                return outcome;
            }
        };
        if records.is_empty() {
            log::info!("No results.");
            return outcome;
        }

        outcome.records = records.len();
        outcome.rows = detail_rows(&records);
        match self.store.write_page(&outcome.basename, 1, &records) {
            Ok(path) => {
                log::info!("Saved RAW detail JSON page: {}", path.display());
                outcome.saved = Some(path);
            }
            Err(e) => log::error!("Failed to write RAW JSON page: {e}"),
        }
        // A merged file left by an earlier lookup of the same basename would
        // shadow the page just written.
        match self.store.remove_merged(&outcome.basename) {
            Ok(true) => log::debug!("Replaced earlier merged JSON for {}", outcome.basename),
            Ok(false) => {}
            Err(e) => log::warn!("Failed to remove earlier merged JSON: {e}"),
        }

        let report = export_stem(&self.store, &outcome.basename, self.selection);
        finalize_pages(&self.store, &outcome.basename, self.selection, &report, true);
        outcome.exports = Some(report);
        outcome
    }

    /// Look up every id in turn, sharing the remaining parameters of `base`.
    ///
    /// A failed lookup is counted and the batch moves on; cancellation is
    /// observed between lookups.
    pub async fn lookup_batch<F>(
        &self,
        base: &SearchParameters,
        ids: &[String],
        cancel: &CancellationToken,
        mut on_lookup: F,
    ) -> BatchSummary
    where
        F: FnMut(&DetailOutcome),
    {
        let mut summary = BatchSummary::default();
        for id in ids {
            if should_stop(cancel) {
                log::info!("Batch cancelled after {} lookup(s)", summary.lookups);
                summary.cancelled = true;
                break;
            }
            let params = base.clone().with("netid", id.as_str());
            let outcome = self.lookup(&params).await;

            summary.lookups += 1;
            summary.records += outcome.records;
            summary.csv_created += usize::from(outcome.csv_written());
            summary.kml_created += usize::from(outcome.kml_written());
            summary.failed += usize::from(outcome.error.is_some());
            on_lookup(&outcome);
        }
        log::info!(
            "Batch complete: created {} CSV(s) and {} KML(s)",
            summary.csv_created,
            summary.kml_created
        );
        summary
    }
}

/// Totals of a batch of detail lookups.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub lookups: usize,
    pub records: usize,
    pub csv_created: usize,
    pub kml_created: usize,
    pub failed: usize,
    pub cancelled: bool,
}
