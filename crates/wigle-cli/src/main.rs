//! wigle - Harvest WiGLE search results into JSON, CSV and KML
//!
//! Paginates the wifi, bluetooth and cell search endpoints in parallel
//! sessions, resolves single devices through the detail endpoints and looks
//! up operators in the MCC/MNC reference.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "wigle")]
#[command(about = "Harvest WiGLE search results into JSON, CSV and KML")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "debug")]
    quiet: bool,

    /// Config file path (default: ./wigle.toml or ~/.config/wigle/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Timeout in seconds for each search page
    #[arg(long, global = true)]
    page_timeout: Option<u64>,

    /// Timeout in seconds for the "Total in DB" count request
    #[arg(long, global = true)]
    count_timeout: Option<u64>,

    /// Timeout in seconds for each MCC/MNC reference request
    #[arg(long, global = true)]
    lookup_timeout: Option<u64>,

    /// Timeout in seconds for each detail request
    #[arg(long, global = true)]
    detail_timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Paginate one or more search categories
    Search(cmd::search::SearchArgs),
    /// Look up one device or a batch of netids
    Detail(cmd::detail::DetailArgs),
    /// Look up operators by MCC/MNC
    Mccmnc(cmd::mccmnc::MccMncArgs),
    /// Re-export CSV/KML from JSON already on disk
    Export(cmd::export::ExportArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(wigle_core::ProgressContext::new());

    // Log lines go through the progress bars in TTY mode so spinners stay intact
    let multi = if progress.is_tty() {
        Some(progress.multi())
    } else {
        None
    };
    wigle_core::init_logging(wigle_core::Verbosity::from_flags(cli.quiet, cli.debug), multi);

    // Load configuration
    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    // Apply HTTP settings (config file defaults, CLI overrides)
    let secs = |flag: Option<u64>, configured: u64| Duration::from_secs(flag.unwrap_or(configured));
    wigle_core::set_http_config(wigle_core::HttpConfig {
        page_timeout: secs(cli.page_timeout, config.http.page_timeout),
        count_timeout: secs(cli.count_timeout, config.http.count_timeout),
        lookup_timeout: secs(cli.lookup_timeout, config.http.lookup_timeout),
        detail_timeout: secs(cli.detail_timeout, config.http.detail_timeout),
        pool_max_idle_per_host: config.http.pool_max_idle_per_host,
    });

    if let Err(e) = wigle_core::install_signal_handlers() {
        log::warn!("Failed to install signal handlers: {e}");
    }

    let client = Arc::new(wigle_core::ApiClient::new(config.api.base_url.clone()));
    client.set_credentials(config.api.credentials());

    match cli.command {
        Command::Search(args) => cmd::search::run(args, &config, &client, &progress),
        Command::Detail(args) => cmd::detail::run(args, &config, &client, &progress),
        Command::Mccmnc(args) => cmd::mccmnc::run(args, &client),
        Command::Export(args) => cmd::export::run(args),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec![
                "Output directory",
                &config.output.default_dir.display().to_string(),
            ]);
            table.add_row(vec!["API base URL", &config.api.base_url]);
            table.add_row(vec![
                "API name",
                config.api.name.as_deref().unwrap_or("not set"),
            ]);
            table.add_row(vec![
                "API token",
                if config.api.token.is_some() {
                    "configured"
                } else {
                    "not set"
                },
            ]);
            let http = wigle_core::http_config();
            table.add_row(vec![
                "Timeouts",
                &format!(
                    "page {}s, count {}s, lookup {}s, detail {}s",
                    http.page_timeout.as_secs(),
                    http.count_timeout.as_secs(),
                    http.lookup_timeout.as_secs(),
                    http.detail_timeout.as_secs()
                ),
            ]);
            table.add_row(vec![
                "Idle connections per host",
                &config.http.pool_max_idle_per_host.to_string(),
            ]);
            table.add_row(vec![
                "Default exports",
                &format!(
                    "csv: {}, kml: {}, keep json: {}",
                    config.export.csv, config.export.kml, config.export.keep_json
                ),
            ]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
