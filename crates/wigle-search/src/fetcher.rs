//! Cursor-driven page loop against one search endpoint

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use wigle_core::{ApiClient, CancellationToken, Record, http_config, parse_body, should_stop};
use wigle_store::RecordStore;

use crate::params::SearchParameters;

/// Cursor fields, first non-empty wins.
const CURSOR_FIELDS: [&str; 2] = ["search_after", "searchAfter"];

/// Parameter that carries the cursor back to the API.
const CURSOR_PARAM: &str = "searchAfter";

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Issue the `totalResults` count request before the first page
    pub count_first: bool,
    pub page_timeout: Duration,
    pub count_timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        let http = http_config();
        Self {
            count_first: true,
            page_timeout: http.page_timeout,
            count_timeout: http.count_timeout,
        }
    }
}

/// Why the loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A response carried no results
    Exhausted,
    /// A page came back without a cursor
    FinalPage,
    /// Cancellation observed at an iteration boundary
    Cancelled,
    /// Transport error, timeout or non-2xx status
    RequestFailed(String),
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exhausted => f.write_str("no more results"),
            Self::FinalPage => f.write_str("final page"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::RequestFailed(e) => write!(f, "request failed: {e}"),
        }
    }
}

/// One fetched page, handed to the caller's live view.
#[derive(Debug)]
pub struct PageEvent<'a> {
    pub page: u32,
    pub records: &'a [Record],
    /// `None` when persisting the page failed
    pub saved: Option<&'a Path>,
    /// Records fetched so far, this page included
    pub total_records: usize,
}

#[derive(Debug)]
pub struct FetchSummary {
    pub requests: u32,
    /// Pages with at least one result
    pub pages: u32,
    pub total_records: usize,
    pub saved: Vec<PathBuf>,
    /// `totalResults` from the count request
    pub reported_total: Option<u64>,
    pub stop: StopReason,
}

impl FetchSummary {
    pub fn is_complete(&self) -> bool {
        matches!(self.stop, StopReason::Exhausted | StopReason::FinalPage)
    }
}

/// Walks the `searchAfter` cursor of one endpoint, persisting every page.
///
/// Requests are strictly sequential. Cancellation is looked at once per
/// iteration, before a request is issued; an in-flight request always runs
/// to completion.
pub struct PageFetcher<'a> {
    client: &'a ApiClient,
    path: &'a str,
    store: RecordStore,
    stem: String,
    options: FetchOptions,
}

impl<'a> PageFetcher<'a> {
    pub fn new(client: &'a ApiClient, path: &'a str, store: RecordStore, stem: impl Into<String>) -> Self {
        Self {
            client,
            path,
            store,
            stem: stem.into(),
            options: FetchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    /// One-off count request for the endpoint's reported total. Failures are logged
    /// and yield `None`.
    pub async fn count(&self, params: &SearchParameters) -> Option<u64> {
        let query = params.clone().with("resultsPerPage", "1");
        let body = match self
            .client
            .get_text(self.path, query.as_query(), self.options.count_timeout)
            .await
        {
            Ok(body) => body,
            Err(e) => {
                log::warn!("Count request failed: {e}");
                return None;
            }
        };
        let total = parse_body(&body)
            .as_ref()
            .and_then(|v| v.get("totalResults"))
            .and_then(Value::as_u64);
        match total {
            Some(n) => log::info!("Total in DB: {n}"),
            None => log::info!("Total in DB: unknown"),
        }
        total
    }

    /// Run the page loop until results run out, the cursor disappears, a
    /// request fails or `cancel` fires.
    ///
    /// `on_page` sees every page with results, including pages whose write
    /// failed.
    pub async fn run<F>(
        &self,
        params: &SearchParameters,
        cancel: &CancellationToken,
        mut on_page: F,
    ) -> FetchSummary
    where
        F: FnMut(&PageEvent<'_>),
    {
        let mut summary = FetchSummary {
            requests: 0,
            pages: 0,
            total_records: 0,
            saved: Vec::new(),
            reported_total: None,
            stop: StopReason::Cancelled,
        };

        if self.options.count_first && !should_stop(cancel) {
            summary.reported_total = self.count(params).await;
        }

        let mut local = params.clone();
        let mut page: u32 = 1;

        while !should_stop(cancel) {
            if page == 1 {
                log::info!("Submitted: {}", self.client.describe(self.path, local.as_query()));
            }

            summary.requests += 1;
            let body = match self
                .client
                .get_text(self.path, local.as_query(), self.options.page_timeout)
                .await
            {
                Ok(body) => body,
                Err(e) => {
                    log::error!("Page {page} request failed: {e}");
                    summary.stop = StopReason::RequestFailed(e.to_string());
                    return summary;
                }
            };

            let data = parse_body(&body).unwrap_or(Value::Null);
            let records = page_results(&data);
            if records.is_empty() {
                log::debug!("Page {page}: no results, stopping");
                summary.stop = StopReason::Exhausted;
                return summary;
            }

            summary.pages += 1;
            summary.total_records += records.len();

            let saved = match self.store.write_page(&self.stem, page, &records) {
                Ok(path) => {
                    log::info!("Page {page}: {} results saved: {}", records.len(), path.display());
                    summary.saved.push(path);
                    summary.saved.last().map(PathBuf::as_path)
                }
                Err(e) => {
                    log::error!("Page {page}: {} results, save failed: {e}", records.len());
                    None
                }
            };
            on_page(&PageEvent {
                page,
                records: &records,
                saved,
                total_records: summary.total_records,
            });

            let Some(cursor) = next_cursor(&data) else {
                summary.stop = StopReason::FinalPage;
                return summary;
            };
            local.set_verbatim(CURSOR_PARAM, cursor);
            page += 1;
        }

        log::info!("Search cancelled after {} page(s)", summary.pages);
        summary.stop = StopReason::Cancelled;
        summary
    }
}

/// Object entries of the response's `results` array.
fn page_results(data: &Value) -> Vec<Record> {
    data.get("results")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_object).cloned().collect())
        .unwrap_or_default()
}

/// Continuation cursor of a response, if any.
///
/// Numeric cursors are echoed back in their JSON text form.
pub fn next_cursor(data: &Value) -> Option<String> {
    CURSOR_FIELDS.iter().find_map(|key| match data.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cursor_prefers_first_non_empty_field() {
        assert_eq!(
            next_cursor(&json!({"search_after": "abc", "searchAfter": "def"})),
            Some("abc".to_string())
        );
        assert_eq!(
            next_cursor(&json!({"search_after": "", "searchAfter": "def"})),
            Some("def".to_string())
        );
        assert_eq!(next_cursor(&json!({"searchAfter": 1234})), Some("1234".to_string()));
        assert_eq!(next_cursor(&json!({"search_after": null})), None);
        assert_eq!(next_cursor(&Value::Null), None);
    }

    #[test]
    fn page_results_skips_non_objects() {
        let data = json!({"results": [{"netid": "A"}, 3, null, {"netid": "B"}]});
        assert_eq!(page_results(&data).len(), 2);
        assert!(page_results(&json!({"results": {}})).is_empty());
        assert!(page_results(&json!([{"netid": "A"}])).is_empty());
    }

    #[test]
    fn stop_reason_display() {
        assert_eq!(StopReason::FinalPage.to_string(), "final page");
        assert_eq!(
            StopReason::RequestFailed("HTTP 500: boom".into()).to_string(),
            "request failed: HTTP 500: boom"
        );
    }
}
