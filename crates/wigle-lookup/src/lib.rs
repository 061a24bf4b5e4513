//! Wigle Lookup - MCC/MNC reference data
//!
//! The reference endpoint is inconsistent about both its query encoding and
//! its response shape. [`lookup`] tries a primary request, then a fixed list
//! of alternate `mccmnc` encodings, and normalises whatever comes back into a
//! flat list of records.

pub mod encoding;
pub mod normalize;
pub mod reference;
pub mod resolve;

pub use encoding::{FALLBACK_ENCODINGS, Encoding, fallback_queries, primary_query};
pub use normalize::normalize;
pub use reference::{REFERENCE_HEADERS, ReferenceRow, write_reference_csv};
pub use resolve::{Attempt, LookupError, LookupOutcome, MCCMNC_PATH, lookup, lookup_with};
