//! Detail subcommand - look up one device, or a batch file of netids

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Args, ValueEnum};

use wigle_core::{ApiClient, SharedProgress, fmt_num};
use wigle_search::{
    BatchSummary, DetailKind, DetailOutcome, DetailRow, DetailRun, SearchParameters, Session,
    parse_assignment, run_batch, run_detail,
};

use super::{ExportFlags, export_rows, output_parent, print_rows, print_summary};
use crate::config::Config;

const ROW_HEADINGS: [&str; 5] = ["Device", "Name", "Lat", "Lon", "Time"];

#[derive(Args, Debug)]
pub struct DetailArgs {
    /// Detail endpoint (network covers Wi-Fi and cell towers)
    #[arg(value_enum)]
    pub kind: KindArg,

    /// Network id (BSSID / MAC) to look up
    #[arg(long, conflicts_with = "batch")]
    pub netid: Option<String>,

    /// Other lookup keys as NAME=VALUE (operator, lac, cid, type, system, network, basestation)
    #[arg(short, long = "param", value_parser = parse_assignment)]
    pub params: Vec<(String, String)>,

    /// Text file of netids, one per line (# comments and blank lines skipped)
    #[arg(short, long)]
    pub batch: Option<PathBuf>,

    /// Parent directory for run output
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub export: ExportFlags,
}

#[derive(Clone, Copy, ValueEnum, Debug, PartialEq, Eq)]
pub enum KindArg {
    #[value(alias = "wifi", alias = "cell")]
    Network,
    #[value(alias = "bluetooth")]
    Bt,
}

impl From<KindArg> for DetailKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Network => DetailKind::Network,
            KindArg::Bt => DetailKind::Bluetooth,
        }
    }
}

enum Finished {
    Single(DetailOutcome),
    Batch(BatchSummary, Vec<DetailRow>),
}

fn lookup_params(args: &DetailArgs) -> SearchParameters {
    let mut params = SearchParameters::from_pairs(args.params.iter().cloned());
    if let Some(netid) = &args.netid {
        params.set("netid", netid.as_str());
    }
    params
}

pub fn run(
    args: DetailArgs,
    config: &Config,
    client: &Arc<ApiClient>,
    progress: &SharedProgress,
) -> Result<()> {
    let kind = DetailKind::from(args.kind);
    let params = lookup_params(&args);
    let parent = output_parent(args.output.clone(), config);
    let detail = DetailRun::prepare(
        client,
        kind,
        params,
        args.batch.as_deref(),
        Some(parent.as_path()),
        args.export.selection(config),
    )?;
    log::info!("Detail lookup ({kind})");
    log::info!("  Output: {}", detail.context.output_dir().display());

    let output_dir = detail.context.output_dir().to_path_buf();
    let mut session: Session<Finished> = Session::new(format!("{kind}-detail"));
    let client = Arc::clone(client);
    let pb = progress.session_line("detail");
    session.start(move |cancel| {
        if !detail.is_batch() {
            let outcome = run_detail(&client, &detail);
            pb.finish_and_clear();
            return Finished::Single(outcome);
        }
        let total = detail.ids.len();
        let mut rows = Vec::new();
        let summary = run_batch(&client, &detail, &cancel, |outcome| {
            rows.extend(outcome.rows.iter().cloned());
            pb.set_message(format!("{} · {} record(s)", outcome.basename, outcome.records));
        });
        pb.finish_and_clear();
        log::debug!("Batch of {total} id(s) finished");
        Finished::Batch(summary, rows)
    })?;

    let Some(finished) = session.wait() else {
        bail!("detail worker ended unexpectedly");
    };

    match finished {
        Finished::Single(outcome) => {
            print_detail_rows(&outcome.rows);
            let mut summary = vec![
                ("Output", output_dir.display().to_string()),
                ("Basename", outcome.basename.clone()),
                ("Records", fmt_num(outcome.records)),
                ("Locations", fmt_num(outcome.rows.len())),
            ];
            if let Some(report) = &outcome.exports {
                summary.extend(export_rows(report));
            }
            print_summary("Detail", &summary);
            if let Some(e) = outcome.error {
                bail!("detail lookup failed: {e}");
            }
        }
        Finished::Batch(batch, rows) => {
            print_detail_rows(&rows);
            print_summary(
                "Batch",
                &[
                    ("Output", output_dir.display().to_string()),
                    ("Lookups", fmt_num(batch.lookups)),
                    ("Records", fmt_num(batch.records)),
                    ("CSV created", batch.csv_created.to_string()),
                    ("KML created", batch.kml_created.to_string()),
                    ("Failed", batch.failed.to_string()),
                    ("Cancelled", batch.cancelled.to_string()),
                ],
            );
            if batch.failed > 0 {
                bail!("{} of {} lookup(s) failed", batch.failed, batch.lookups);
            }
        }
    }
    Ok(())
}

fn print_detail_rows(rows: &[DetailRow]) {
    if rows.is_empty() {
        return;
    }
    print_rows(
        &ROW_HEADINGS,
        rows.iter()
            .map(|r| [&r.device_id, &r.name, &r.lat, &r.lon, &r.time]),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: DetailArgs,
    }

    #[test]
    fn netid_joins_other_keys() {
        let h = Harness::try_parse_from([
            "wigle", "wifi", "--netid", "AA:BB:CC", "-p", "type=wifi",
        ])
        .unwrap();
        assert_eq!(h.args.kind, KindArg::Network);
        let params = lookup_params(&h.args);
        assert_eq!(params.get("netid"), Some("AA:BB:CC"));
        assert_eq!(params.get("type"), Some("wifi"));
    }

    #[test]
    fn netid_and_batch_conflict() {
        assert!(
            Harness::try_parse_from(["wigle", "bt", "--netid", "x", "--batch", "ids.txt"])
                .is_err()
        );
    }

    #[test]
    fn bluetooth_rejects_cell_keys_before_creating_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.output.default_dir = dir.path().to_path_buf();
        let client = Arc::new(
            ApiClient::new("http://127.0.0.1:9")
                .with_credentials(wigle_core::Credentials::new("user", "tok")),
        );
        let h = Harness::try_parse_from(["wigle", "bluetooth", "-p", "lac=7"]).unwrap();
        let progress = Arc::new(wigle_core::ProgressContext::hidden());

        let err = run(h.args, &config, &client, &progress).unwrap_err();
        assert_eq!(err.to_string(), "unknown parameter 'lac' for bluetooth detail");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
