//! Wigle Search - paginated search and detail lookups
//!
//! A search run walks the `searchAfter` cursor of one category endpoint
//! (Wi-Fi, Bluetooth or cell), persisting every page as it arrives, then
//! derives the selected exports from the pages on disk. Detail lookups are
//! single-request runs keyed by a network id, optionally batched from a file.
//!
//! Runs execute on a [`Session`]: one background worker per logical session,
//! each with its own cancellation token.

pub mod category;
pub mod detail;
pub mod fetcher;
pub mod params;
pub mod runner;
pub mod session;

// Re-exports
pub use category::{Category, DetailKind};
pub use detail::{
    BatchSummary, DetailOutcome, DetailRow, DetailTarget, detail_basename, detail_rows,
    fetch_detail, parse_batch, read_batch_file,
};
pub use fetcher::{FetchOptions, FetchSummary, PageEvent, PageFetcher, StopReason, next_cursor};
pub use params::{SearchParameters, UnknownParameter, parse_assignment};
pub use runner::{DetailRun, RunSummary, SearchRun, execute_search, run_batch, run_detail, run_search};
pub use session::{Session, SessionError};
