//! Primary request plus ordered fallbacks

use std::fmt;
use std::future::Future;

use serde_json::Value;
use wigle_core::{ApiClient, ApiError, Query, Record, http_config, parse_body};

use crate::encoding::{fallback_queries, primary_query};
use crate::normalize::normalize;

/// Reference endpoint path relative to the API base.
pub const MCCMNC_PATH: &str = "cell/mccMnc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Neither MCC nor MNC was given
    MissingCode,
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCode => f.write_str("enter at least an MCC or an MCC + MNC"),
        }
    }
}

impl std::error::Error for LookupError {}

/// One request and how it went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub query: Query,
    /// Normalised record count, or the request error
    pub result: Result<usize, String>,
}

#[derive(Debug, Default)]
pub struct LookupOutcome {
    /// Empty means "no results"
    pub records: Vec<Record>,
    pub attempts: Vec<Attempt>,
}

fn describe(query: &Query) -> String {
    query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Run the lookup sequence with a caller-supplied request function.
///
/// The primary query goes first. Only when it yields nothing and both codes
/// are given are the fallback encodings tried, stopping at the first
/// non-empty result. Request failures are logged and the next attempt
/// proceeds.
pub async fn lookup_with<F, Fut>(
    mcc: &str,
    mnc: &str,
    mut fetch: F,
) -> Result<LookupOutcome, LookupError>
where
    F: FnMut(Query) -> Fut,
    Fut: Future<Output = Result<Value, ApiError>>,
{
    let (mcc, mnc) = (mcc.trim(), mnc.trim());
    let primary = primary_query(mcc, mnc).ok_or(LookupError::MissingCode)?;

    let mut outcome = LookupOutcome::default();
    let queries = std::iter::once(primary).chain(fallback_queries(mcc, mnc));
    for (i, query) in queries.enumerate() {
        if i > 0 {
            log::info!("Retrying with {}", describe(&query));
        }
        let result = match fetch(query.clone()).await {
            Ok(data) => {
                let records = normalize(&data, &query);
                log::info!("{}: {} result(s)", describe(&query), records.len());
                outcome.records = records;
                Ok(outcome.records.len())
            }
            Err(e) => {
                if i == 0 {
                    log::warn!("Primary request failed: {e}");
                } else {
                    log::warn!("Retry failed: {e}");
                }
                Err(e.to_string())
            }
        };
        outcome.attempts.push(Attempt { query, result });
        if !outcome.records.is_empty() {
            return Ok(outcome);
        }
    }

    log::info!("No results.");
    Ok(outcome)
}

/// Look up `mcc`/`mnc` against the reference endpoint of `client`.
pub async fn lookup(client: &ApiClient, mcc: &str, mnc: &str) -> Result<LookupOutcome, LookupError> {
    let timeout = http_config().lookup_timeout;
    log::info!("GET {}?mcc={mcc}&mnc={mnc}", client.endpoint(MCCMNC_PATH));
    lookup_with(mcc, mnc, |query| async move {
        let body = client.get_text(MCCMNC_PATH, &query, timeout).await?;
        Ok::<_, ApiError>(parse_body(&body).unwrap_or(Value::Null))
    })
    .await
}
