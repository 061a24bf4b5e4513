//! MCC/MNC reference lookup

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;

use wigle_core::{ApiClient, SHARED_RUNTIME};
use wigle_lookup::{REFERENCE_HEADERS, ReferenceRow, lookup, write_reference_csv};

use super::{print_rows, print_summary};

#[derive(Args, Debug)]
pub struct MccMncArgs {
    /// Mobile country code
    #[arg(long, default_value = "")]
    pub mcc: String,

    /// Mobile network code (needs --mcc for the padded fallbacks)
    #[arg(long, default_value = "")]
    pub mnc: String,

    /// Also write the rows to this CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

pub fn run(args: MccMncArgs, client: &ApiClient) -> Result<()> {
    if !client.has_credentials() {
        bail!("API name and token are not set (use [api] in wigle.toml or WIGLE_API_NAME / WIGLE_API_TOKEN)");
    }

    let outcome = SHARED_RUNTIME
        .handle()
        .block_on(lookup(client, &args.mcc, &args.mnc))?;
    let rows: Vec<ReferenceRow> = outcome
        .records
        .iter()
        .map(ReferenceRow::from_record)
        .collect();

    if rows.is_empty() {
        eprintln!("No results.");
    } else {
        print_rows(&REFERENCE_HEADERS, rows.iter().map(ReferenceRow::fields));
    }

    let mut summary = Vec::with_capacity(outcome.attempts.len() + 2);
    for attempt in &outcome.attempts {
        let query = attempt
            .query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let result = match &attempt.result {
            Ok(n) => format!("{n} result(s)"),
            Err(e) => e.clone(),
        };
        summary.push((query, result));
    }

    if let Some(path) = &args.csv {
        if rows.is_empty() {
            log::info!("Nothing to export (no results)");
        } else {
            write_reference_csv(&rows, path)?;
            summary.push(("CSV".to_string(), path.display().to_string()));
        }
    }

    let borrowed: Vec<(&str, String)> = summary
        .iter()
        .map(|(k, v)| (k.as_str(), v.clone()))
        .collect();
    print_summary("MCC/MNC", &borrowed);
    Ok(())
}
