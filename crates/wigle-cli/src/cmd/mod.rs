//! Subcommands and the table helpers they share

pub mod detail;
pub mod export;
pub mod mccmnc;
pub mod search;

use std::path::PathBuf;

use clap::Args;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use wigle_export::{ExportReport, ExportSelection};

use crate::config::Config;

/// Export toggles shared by `search` and `detail`.
///
/// When none is given the `[export]` defaults from the config apply.
#[derive(Args, Debug, Clone, Copy)]
pub struct ExportFlags {
    /// Write a CSV of the flattened records
    #[arg(long)]
    pub csv: bool,

    /// Write a KML with one placemark per located record
    #[arg(long)]
    pub kml: bool,

    /// Keep the raw JSON pages (detail runs merge them into one file)
    #[arg(long)]
    pub keep_json: bool,

    /// Ignore configured export defaults; only fetch (pages are kept)
    #[arg(long, conflicts_with_all = ["csv", "kml", "keep_json"])]
    pub no_export: bool,
}

impl ExportFlags {
    pub fn selection(&self, config: &Config) -> ExportSelection {
        if self.no_export {
            return ExportSelection {
                csv: false,
                kml: false,
                keep_json: true,
            };
        }
        if self.csv || self.kml || self.keep_json {
            return ExportSelection {
                csv: self.csv,
                kml: self.kml,
                keep_json: self.keep_json,
            };
        }
        config.export.into()
    }
}

/// Output parent from the flag, else the configured default.
pub fn output_parent(flag: Option<PathBuf>, config: &Config) -> PathBuf {
    flag.unwrap_or_else(|| config.output.default_dir.clone())
}

fn styled_table(headings: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(
            headings
                .iter()
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    table
}

/// Print a key-value summary table on stderr
pub fn print_summary(title: &str, rows: &[(&str, String)]) {
    let mut table = styled_table(&[title, "Value"]);
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    eprintln!("\n{table}");
}

/// Print result rows as a table on stdout
pub fn print_rows<R, S>(headings: &[&str], rows: R)
where
    R: IntoIterator,
    R::Item: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut table = styled_table(headings);
    for row in rows {
        table.add_row(row.into_iter().map(|c| Cell::new(c.as_ref())).collect::<Vec<_>>());
    }
    println!("{table}");
}

/// Summary rows for the two derived exports.
pub fn export_rows(report: &ExportReport) -> [(&'static str, String); 2] {
    [("CSV", report.csv.to_string()), ("KML", report.kml.to_string())]
}
