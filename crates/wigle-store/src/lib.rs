//! wigle-store: on-disk artifacts of a harvesting run
//!
//! Every run owns one output directory. Raw API pages land there as compact
//! JSON arrays (`{stem}-page_{n}.json`), written atomically so a page is
//! either complete or absent. Exports read the pages back through this crate
//! and cleanup deletes them again.

pub mod context;
pub mod store;

pub use context::{RunContext, sanitize_basename};
pub use store::{RecordStore, StoreError, delete_files, load_all, load_records};
