//! Run orchestration: configuration checks, fetch, export, cleanup
//!
//! `prepare` functions perform every configuration check and create the
//! output directory; they are meant to be called before a worker is spawned.
//! The `run_*` functions are synchronous and bridge onto the shared runtime,
//! so they can be the body of a [`Session`](crate::Session) worker.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use wigle_core::{ApiClient, CancellationToken, SHARED_RUNTIME, fmt_num, http_config};
use wigle_export::{ExportReport, ExportSelection, export_stem, finalize_pages};
use wigle_store::RunContext;

use crate::category::{Category, DetailKind};
use crate::detail::{BatchSummary, DetailOutcome, DetailTarget, read_batch_file};
use crate::fetcher::{FetchOptions, FetchSummary, PageEvent, PageFetcher};
use crate::params::SearchParameters;

/// Output directory prefix of detail runs.
const DETAIL_PREFIX: &str = "detail";

fn ensure_credentials(client: &ApiClient) -> Result<()> {
    if !client.has_credentials() {
        bail!("API name and token are not set (use [api] in wigle.toml or WIGLE_API_NAME / WIGLE_API_TOKEN)");
    }
    Ok(())
}

fn output_parent(parent: Option<&Path>) -> Result<&Path> {
    parent.context("no output directory chosen")
}

/// A validated search run with its output directory already created.
#[derive(Debug, Clone)]
pub struct SearchRun {
    pub category: Category,
    pub params: SearchParameters,
    pub context: RunContext,
    pub exports: ExportSelection,
    pub fetch: FetchOptions,
}

impl SearchRun {
    pub fn prepare(
        client: &ApiClient,
        category: Category,
        params: SearchParameters,
        parent: Option<&Path>,
        exports: ExportSelection,
        fetch: FetchOptions,
    ) -> Result<Self> {
        ensure_credentials(client)?;
        let parent = output_parent(parent)?;
        let context = RunContext::create(parent, category.save_prefix())?;
        log::debug!("{category}: output directory {}", context.output_dir().display());
        Ok(Self {
            category,
            params,
            context,
            exports,
            fetch,
        })
    }

    /// Prepare one run per `(category, params)` pair, all or nothing.
    ///
    /// Every check runs before the first directory is created, and any
    /// directory already created is removed again when a later one fails.
    pub fn prepare_all(
        client: &ApiClient,
        runs: Vec<(Category, SearchParameters)>,
        parent: Option<&Path>,
        exports: ExportSelection,
        fetch: FetchOptions,
    ) -> Result<Vec<Self>> {
        ensure_credentials(client)?;
        let parent = output_parent(parent)?;

        let mut prepared: Vec<Self> = Vec::with_capacity(runs.len());
        for (category, params) in runs {
            match Self::prepare(client, category, params, Some(parent), exports, fetch) {
                Ok(run) => prepared.push(run),
                Err(e) => {
                    for run in &prepared {
                        let dir = run.context.output_dir();
                        if let Err(rm) = std::fs::remove_dir_all(dir) {
                            log::warn!("Failed to remove {}: {rm}", dir.display());
                        }
                    }
                    return Err(e);
                }
            }
        }
        Ok(prepared)
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub fetch: FetchSummary,
    pub exports: ExportReport,
    pub removed_pages: usize,
    pub output_dir: PathBuf,
}

/// Fetch every page, then export from what landed on disk and dispose of
/// the pages.
pub async fn execute_search<F>(
    client: &ApiClient,
    run: &SearchRun,
    cancel: &CancellationToken,
    on_page: F,
) -> RunSummary
where
    F: FnMut(&PageEvent<'_>),
{
    let store = run.context.store();
    let stem = run.context.stem();

    let fetch = PageFetcher::new(client, run.category.search_path(), store.clone(), stem.as_str())
        .with_options(run.fetch)
        .run(&run.params, cancel, on_page)
        .await;
    log::info!(
        "{}: {} results in {} page(s) ({})",
        run.category,
        fmt_num(fetch.total_records),
        fetch.pages,
        fetch.stop
    );

    let exports = export_stem(&store, &stem, run.exports);
    let removed_pages = finalize_pages(&store, &stem, run.exports, &exports, false);

    RunSummary {
        fetch,
        exports,
        removed_pages,
        output_dir: run.context.output_dir().to_path_buf(),
    }
}

/// Blocking form of [`execute_search`] for worker threads.
pub fn run_search<F>(
    client: &ApiClient,
    run: &SearchRun,
    cancel: &CancellationToken,
    on_page: F,
) -> RunSummary
where
    F: FnMut(&PageEvent<'_>),
{
    SHARED_RUNTIME
        .handle()
        .block_on(execute_search(client, run, cancel, on_page))
}

/// A validated detail run: one lookup, or a batch of network ids.
#[derive(Debug, Clone)]
pub struct DetailRun {
    pub kind: DetailKind,
    pub params: SearchParameters,
    /// Batch ids; empty for a single lookup
    pub ids: Vec<String>,
    pub context: RunContext,
    pub exports: ExportSelection,
    pub timeout: Duration,
}

impl DetailRun {
    /// Check credentials, parameter names and the batch file, then create
    /// `<parent>/detail-<epoch>`.
    pub fn prepare(
        client: &ApiClient,
        kind: DetailKind,
        params: SearchParameters,
        batch: Option<&Path>,
        parent: Option<&Path>,
        exports: ExportSelection,
    ) -> Result<Self> {
        ensure_credentials(client)?;
        if let Some((key, _)) = params.iter().find(|(k, _)| !kind.keys().contains(k)) {
            bail!("unknown parameter '{key}' for {kind} detail");
        }

        let ids = match batch {
            Some(path) => read_batch_file(path)?,
            None => {
                if params.is_empty() {
                    bail!("no lookup key given (expected one of: {})", kind.keys().join(", "));
                }
                Vec::new()
            }
        };

        let parent = output_parent(parent)?;
        let context = RunContext::create(parent, DETAIL_PREFIX)?;
        Ok(Self {
            kind,
            params,
            ids,
            context,
            exports,
            timeout: http_config().detail_timeout,
        })
    }

    pub fn is_batch(&self) -> bool {
        !self.ids.is_empty()
    }

    fn target<'a>(&self, client: &'a ApiClient) -> DetailTarget<'a> {
        DetailTarget {
            client,
            kind: self.kind,
            store: self.context.store(),
            selection: self.exports,
            timeout: self.timeout,
        }
    }
}

/// Single lookup, blocking.
pub fn run_detail(client: &ApiClient, run: &DetailRun) -> DetailOutcome {
    let target = run.target(client);
    SHARED_RUNTIME.handle().block_on(target.lookup(&run.params))
}

/// Batch lookup, blocking. `on_lookup` sees each outcome as it completes.
pub fn run_batch<F>(
    client: &ApiClient,
    run: &DetailRun,
    cancel: &CancellationToken,
    on_lookup: F,
) -> BatchSummary
where
    F: FnMut(&DetailOutcome),
{
    let target = run.target(client);
    SHARED_RUNTIME
        .handle()
        .block_on(target.lookup_batch(&run.params, &run.ids, cancel, on_lookup))
}
