//! Search subcommand - paginate one or more categories in parallel sessions

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Args, ValueEnum};

use wigle_core::{ApiClient, SharedProgress, fmt_num, report_page};
use wigle_search::{
    Category, FetchOptions, RunSummary, SearchParameters, SearchRun, Session, StopReason,
    parse_assignment, run_search,
};

use super::{ExportFlags, export_rows, output_parent, print_rows, print_summary};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Categories to search; each runs in its own session
    #[arg(value_enum, required = true, num_args = 1..)]
    pub categories: Vec<CategoryArg>,

    /// Search parameter as NAME=VALUE (repeatable, e.g. -p ssidlike=cafe%)
    #[arg(short, long = "param", value_parser = parse_assignment)]
    pub params: Vec<(String, String)>,

    /// Parent directory for run output
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Skip the "Total in DB" count request
    #[arg(long)]
    pub no_count: bool,

    /// Rows of each category to show once the run ends (0 disables)
    #[arg(long, default_value_t = 20)]
    pub preview: usize,

    #[command(flatten)]
    pub export: ExportFlags,
}

#[derive(Clone, Copy, ValueEnum, Debug, PartialEq, Eq)]
pub enum CategoryArg {
    Wifi,
    #[value(alias = "bluetooth")]
    Bt,
    Cell,
}

impl From<CategoryArg> for Category {
    fn from(c: CategoryArg) -> Self {
        match c {
            CategoryArg::Wifi => Category::Wifi,
            CategoryArg::Bt => Category::Bluetooth,
            CategoryArg::Cell => Category::Cell,
        }
    }
}

type Preview = Vec<[String; 5]>;

pub fn run(
    args: SearchArgs,
    config: &Config,
    client: &Arc<ApiClient>,
    progress: &SharedProgress,
) -> Result<()> {
    let mut categories: Vec<Category> = Vec::new();
    for c in &args.categories {
        let c = Category::from(*c);
        if !categories.contains(&c) {
            categories.push(c);
        }
    }

    // Vocabulary checks for every category before any directory is created
    let params = categories
        .iter()
        .map(|&c| SearchParameters::for_category(c, args.params.iter().cloned()))
        .collect::<Result<Vec<_>, _>>()?;

    let parent = output_parent(args.output, config);
    let exports = args.export.selection(config);
    let fetch = FetchOptions {
        count_first: !args.no_count,
        ..FetchOptions::default()
    };

    let runs = SearchRun::prepare_all(
        client,
        categories.into_iter().zip(params).collect(),
        Some(parent.as_path()),
        exports,
        fetch,
    )?;

    log::info!("Searching {} categor(ies)", runs.len());
    log::info!("  Output: {}", parent.display());

    let mut sessions = Vec::with_capacity(runs.len());
    for run in runs {
        let mut session: Session<(Category, RunSummary, Preview)> =
            Session::new(run.category.to_string());
        let client = Arc::clone(client);
        let pb = progress.session_line(run.category.save_prefix());
        let limit = args.preview;
        session.start(move |cancel| {
            let mut preview = Preview::new();
            let summary = run_search(&client, &run, &cancel, |event| {
                report_page(&pb, event.page, event.total_records);
                let room = limit.saturating_sub(preview.len());
                preview.extend(
                    event
                        .records
                        .iter()
                        .take(room)
                        .map(|r| run.category.preview_row(r)),
                );
            });
            pb.finish_and_clear();
            (run.category, summary, preview)
        })?;
        sessions.push(session);
    }

    let mut failed = Vec::new();
    for mut session in sessions {
        let Some((category, summary, preview)) = session.wait() else {
            failed.push(session.name().to_string());
            continue;
        };
        if !preview.is_empty() {
            print_rows(&category.preview_headings(), preview);
        }
        report(category, &summary);

        if matches!(summary.fetch.stop, StopReason::RequestFailed(_)) || summary.exports.any_failed()
        {
            failed.push(category.to_string());
        }
    }

    if !failed.is_empty() {
        bail!("search failed for: {}", failed.join(", "));
    }
    Ok(())
}

fn report(category: Category, summary: &RunSummary) {
    let fetch = &summary.fetch;
    let mut rows = vec![
        ("Output", summary.output_dir.display().to_string()),
        (
            "Total in DB",
            fetch
                .reported_total
                .map_or_else(|| "unknown".to_string(), |n| fmt_num(n as usize)),
        ),
        (
            "Records",
            format!(
                "{} in {} page(s), {} request(s)",
                fmt_num(fetch.total_records),
                fetch.pages,
                fetch.requests
            ),
        ),
        ("Stopped", fetch.stop.to_string()),
    ];
    rows.extend(export_rows(&summary.exports));
    rows.push(("Pages removed", summary.removed_pages.to_string()));
    print_summary(category.save_prefix(), &rows);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: SearchArgs,
    }

    #[test]
    fn parses_categories_and_params() {
        let h = Harness::try_parse_from([
            "wigle", "wifi", "bluetooth", "-p", "ssidlike=cafe%", "--param", "latrange1=1.5",
            "--kml",
        ])
        .unwrap();
        assert_eq!(h.args.categories, vec![CategoryArg::Wifi, CategoryArg::Bt]);
        assert_eq!(
            h.args.params,
            vec![
                ("ssidlike".to_string(), "cafe%".to_string()),
                ("latrange1".to_string(), "1.5".to_string())
            ]
        );
        assert!(h.args.export.kml);
        assert_eq!(h.args.preview, 20);
    }

    #[test]
    fn malformed_param_is_a_usage_error() {
        assert!(Harness::try_parse_from(["wigle", "cell", "-p", "noequals"]).is_err());
        assert!(Harness::try_parse_from(["wigle"]).is_err());
    }

    #[test]
    fn category_args_map_to_endpoints() {
        assert_eq!(Category::from(CategoryArg::Bt).search_path(), "bluetooth/search");
        assert_eq!(Category::from(CategoryArg::Cell).save_prefix(), "cell-basic");
    }

    #[test]
    fn unknown_parameter_fails_before_any_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.output.default_dir = dir.path().to_path_buf();
        let client = Arc::new(
            ApiClient::new("http://127.0.0.1:9")
                .with_credentials(wigle_core::Credentials::new("user", "tok")),
        );
        let h = Harness::try_parse_from(["wigle", "wifi", "bt", "-p", "ssid=home"]).unwrap();
        let progress = Arc::new(wigle_core::ProgressContext::hidden());

        // `ssid` is wifi vocabulary but not bluetooth
        let err = run(h.args, &config, &client, &progress).unwrap_err();
        assert!(err.to_string().contains("'ssid'"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_credentials_leave_no_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.output.default_dir = dir.path().to_path_buf();
        let client = Arc::new(ApiClient::new("http://127.0.0.1:9"));
        let h = Harness::try_parse_from(["wigle", "wifi", "cell"]).unwrap();
        let progress = Arc::new(wigle_core::ProgressContext::hidden());

        let err = run(h.args, &config, &client, &progress).unwrap_err();
        assert!(err.to_string().contains("token"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
