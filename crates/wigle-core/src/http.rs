//! HTTP plumbing shared by every WiGLE endpoint.
//!
//! One pooled async reqwest client and one tokio runtime live for the whole
//! process. [`ApiClient`] layers the API base URL and the account credentials
//! on top, and turns every response into either a body string or an
//! [`ApiError`]. Session workers are plain threads, so they reach the async
//! client through `SHARED_RUNTIME.handle().block_on(...)`.

use std::sync::{LazyLock, OnceLock, PoisonError, RwLock};
use std::time::Duration;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("wigle-harvest/", env!("CARGO_PKG_VERSION"), " (+local)");

/// Error bodies longer than this are cut before they reach a log line
const ERROR_BODY_LIMIT: usize = 400;

/// Ordered query parameters as sent on the wire.
pub type Query = Vec<(String, String)>;

/// Timeouts and pool sizing applied to every request.
#[derive(Debug, Clone, Copy)]
pub struct HttpConfig {
    /// Search page requests
    pub page_timeout: Duration,
    /// The one-off `totalResults` count request before pagination
    pub count_timeout: Duration,
    /// MCC/MNC reference lookups
    pub lookup_timeout: Duration,
    /// Network / bluetooth detail requests
    pub detail_timeout: Duration,
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            page_timeout: Duration::from_secs(60),
            count_timeout: Duration::from_secs(30),
            lookup_timeout: Duration::from_secs(30),
            detail_timeout: Duration::from_secs(60),
            pool_max_idle_per_host: 32,
        }
    }
}

static HTTP_CONFIG: OnceLock<HttpConfig> = OnceLock::new();

/// Install process-wide HTTP settings. Only the first call wins; it must
/// happen before the first request if the pool size is to take effect.
pub fn set_http_config(config: HttpConfig) {
    if HTTP_CONFIG.set(config).is_err() {
        log::debug!("HTTP config already initialised, ignoring update");
    }
}

/// Current HTTP settings (defaults when never set).
pub fn http_config() -> &'static HttpConfig {
    HTTP_CONFIG.get_or_init(HttpConfig::default)
}

/// Error types for API requests
#[derive(Debug)]
pub enum ApiError {
    /// Transport failure or non-2xx response, with optional status code
    Http {
        status: Option<u16>,
        message: String,
    },
    /// No complete response within the per-request timeout
    Timeout(Duration),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Timeout(after) => write!(f, "request timed out after {}s", after.as_secs()),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Convert a reqwest error, dropping the URL so query strings stay out of logs.
    pub fn from_reqwest(e: reqwest::Error, timeout: Duration) -> Self {
        if e.is_timeout() {
            return Self::Timeout(timeout);
        }
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.without_url().to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => *status,
            Self::Timeout(_) => None,
        }
    }
}

/// Shared async HTTP client with connection pooling.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(http_config().pool_max_idle_per_host)
        .user_agent(USER_AGENT)
        .build()
        .expect("failed to build HTTP client")
});

/// Get shared HTTP client.
pub fn http_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// WiGLE API name + token pair, sent as HTTP basic auth.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub name: String,
    pub token: String,
}

impl Credentials {
    pub fn new(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
        }
    }

    /// Both halves present and non-blank
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.token.trim().is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("name", &self.name)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Credentialed view of the WiGLE API rooted at a base URL.
///
/// Credentials sit behind a lock so they can be swapped while sessions keep
/// using the same connection pool.
#[derive(Debug)]
pub struct ApiClient {
    base_url: String,
    credentials: RwLock<Option<Credentials>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credentials: RwLock::new(None),
        }
    }

    pub fn with_credentials(self, credentials: Credentials) -> Self {
        self.set_credentials(Some(credentials));
        self
    }

    /// Replace (or clear) the credentials used by subsequent requests.
    pub fn set_credentials(&self, credentials: Option<Credentials>) {
        let credentials = credentials.filter(Credentials::is_complete);
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = credentials;
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials().is_some()
    }

    fn credentials(&self) -> Option<Credentials> {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an endpoint path (absolute URLs pass through).
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Fully encoded request URL, for "submitted" log lines.
    pub fn describe(&self, path: &str, query: &[(String, String)]) -> String {
        let endpoint = self.endpoint(path);
        match http_client().get(&endpoint).query(query).build() {
            Ok(req) => req.url().to_string(),
            Err(_) => format!("{endpoint} with params {query:?}"),
        }
    }

    /// GET `path` with `query`, returning the body of a 2xx response.
    ///
    /// Non-2xx responses carry the endpoint's own error message (JSON
    /// `message`/`error` field, else the start of the body).
    pub async fn get_text(
        &self,
        path: &str,
        query: &[(String, String)],
        timeout: Duration,
    ) -> Result<String, ApiError> {
        let mut request = http_client()
            .get(self.endpoint(path))
            .query(query)
            .timeout(timeout);
        if let Some(creds) = self.credentials() {
            request = request.basic_auth(&creds.name, Some(&creds.token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(e, timeout))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from_reqwest(e, timeout))?;

        if !status.is_success() {
            return Err(ApiError::Http {
                status: Some(status.as_u16()),
                message: error_message(&body, status.canonical_reason()),
            });
        }
        Ok(body)
    }
}

/// Pull a human-readable message out of an error response body.
fn error_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(serde_json::Value::String(msg)) = map.get(key) {
                return msg.clone();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return reason.unwrap_or("Unknown error").to_string();
    }
    trimmed.chars().take(ERROR_BODY_LIMIT).collect()
}

/// Parse a response body as JSON. Malformed bodies yield `None`; callers
/// treat that as an empty result rather than an error.
pub fn parse_body(body: &str) -> Option<serde_json::Value> {
    match serde_json::from_str(body) {
        Ok(v) => Some(v),
        Err(e) => {
            log::debug!("response body is not JSON ({e}), treating as empty");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn display_http_with_status() {
        let err = ApiError::Http {
            status: Some(401),
            message: "unauthorized".to_string(),
        };
        assert_eq!(format!("{err}"), "HTTP 401: unauthorized");
    }

    #[test]
    fn display_http_without_status() {
        let err = ApiError::Http {
            status: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(format!("{err}"), "HTTP error: connection refused");
    }

    #[test]
    fn display_timeout() {
        let err = ApiError::Timeout(Duration::from_secs(60));
        assert_eq!(format!("{err}"), "request timed out after 60s");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client = ApiClient::new("https://api.wigle.net/api/v2/");
        assert_eq!(
            client.endpoint("/network/search"),
            "https://api.wigle.net/api/v2/network/search"
        );
        assert_eq!(
            client.endpoint("cell/mccMnc"),
            "https://api.wigle.net/api/v2/cell/mccMnc"
        );
    }

    #[test]
    fn endpoint_passes_absolute_urls_through() {
        let client = ApiClient::new("https://api.wigle.net/api/v2");
        assert_eq!(
            client.endpoint("http://localhost:9000/x"),
            "http://localhost:9000/x"
        );
    }

    #[test]
    fn describe_encodes_query() {
        let client = ApiClient::new("https://api.wigle.net/api/v2");
        let url = client.describe(
            "network/search",
            &[("ssid".to_string(), "cafe wifi".to_string())],
        );
        assert!(url.starts_with("https://api.wigle.net/api/v2/network/search?ssid=cafe"));
    }

    #[test]
    fn incomplete_credentials_are_ignored() {
        let client = ApiClient::new("http://localhost");
        client.set_credentials(Some(Credentials::new("user", "  ")));
        assert!(!client.has_credentials());
        client.set_credentials(Some(Credentials::new("user", "tok")));
        assert!(client.has_credentials());
        client.set_credentials(None);
        assert!(!client.has_credentials());
    }

    #[test]
    fn credentials_debug_hides_token() {
        let creds = Credentials::new("user", "very-secret");
        let shown = format!("{creds:?}");
        assert!(shown.contains("user"));
        assert!(!shown.contains("very-secret"));
    }

    #[test]
    fn error_message_prefers_json_message() {
        assert_eq!(
            error_message(r#"{"success":false,"message":"too many queries"}"#, None),
            "too many queries"
        );
        assert_eq!(error_message(r#"{"error":"bad mcc"}"#, None), "bad mcc");
    }

    #[test]
    fn error_message_truncates_plain_body() {
        let body = "x".repeat(1000);
        assert_eq!(error_message(&body, None).len(), ERROR_BODY_LIMIT);
        assert_eq!(error_message("  ", Some("Not Found")), "Not Found");
    }

    #[test]
    fn parse_body_rejects_garbage() {
        assert!(parse_body("<html>").is_none());
        assert!(parse_body(r#"{"results":[]}"#).is_some());
    }

    #[tokio::test]
    async fn get_text_sends_basic_auth_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/network/search"))
            .and(query_param("ssid", "cafe"))
            .and(header("authorization", "Basic dXNlcjp0b2s="))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"results":[]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).with_credentials(Credentials::new("user", "tok"));
        let body = client
            .get_text(
                "network/search",
                &[("ssid".to_string(), "cafe".to_string())],
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert_eq!(body, r#"{"results":[]}"#);
    }

    #[tokio::test]
    async fn get_text_maps_non_success_to_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cell/mccMnc"))
            .respond_with(
                ResponseTemplate::new(429).set_body_string(r#"{"message":"too many queries today"}"#),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let err = client
            .get_text("cell/mccMnc", &[], Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(429));
        assert_eq!(format!("{err}"), "HTTP 429: too many queries today");
    }
}
