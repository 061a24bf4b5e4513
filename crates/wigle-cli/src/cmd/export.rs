//! Export subcommand - rebuild CSV/KML from JSON already on disk

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;

use wigle_export::{ExportSelection, export_stem};
use wigle_store::RecordStore;

use super::{export_rows, print_summary};

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Run directory holding the JSON pages (or merged JSON)
    pub dir: PathBuf,

    /// File stem, e.g. wifi-basic-wifi-basic-1700000000 (inferred when the directory holds one)
    #[arg(short, long)]
    pub stem: Option<String>,

    /// Write CSV (both formats when neither flag is given)
    #[arg(long)]
    pub csv: bool,

    /// Write KML (both formats when neither flag is given)
    #[arg(long)]
    pub kml: bool,
}

impl ExportArgs {
    fn selection(&self) -> ExportSelection {
        let both = !self.csv && !self.kml;
        ExportSelection {
            csv: self.csv || both,
            kml: self.kml || both,
            // pages on disk are never touched here
            keep_json: true,
        }
    }
}

fn resolve_stem(store: &RecordStore, stem: Option<String>) -> Result<String> {
    if let Some(stem) = stem {
        return Ok(stem);
    }
    let mut stems = store.stems();
    match stems.len() {
        0 => bail!("no JSON pages found in {}", store.dir().display()),
        1 => Ok(stems.remove(0)),
        _ => bail!(
            "several stems in {}, pick one with --stem: {}",
            store.dir().display(),
            stems.join(", ")
        ),
    }
}

pub fn run(args: ExportArgs) -> Result<()> {
    if !args.dir.is_dir() {
        bail!("not a directory: {}", args.dir.display());
    }
    let store = RecordStore::new(&args.dir);
    let selection = args.selection();
    let stem = resolve_stem(&store, args.stem)?;

    let sources = store.source_files(&stem);
    if sources.is_empty() {
        bail!("no JSON pages for stem '{stem}' in {}", store.dir().display());
    }
    log::info!("Exporting {stem} from {} file(s)", sources.len());

    let report = export_stem(&store, &stem, selection);
    let mut rows = vec![
        ("Stem", stem.clone()),
        ("Sources", sources.len().to_string()),
    ];
    rows.extend(export_rows(&report));
    print_summary("Export", &rows);

    if report.any_failed() {
        bail!("export failed for {stem}");
    }
    Ok(())
}
