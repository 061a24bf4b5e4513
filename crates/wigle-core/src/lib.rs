//! Wigle Core - Common infrastructure for the WiGLE harvesting pipeline
//!
//! This crate provides the pieces every other crate leans on: the shared
//! HTTP client and runtime, the schema-less record model, cooperative
//! cancellation, logging and progress reporting.

pub mod http;
pub mod logging;
pub mod progress;
pub mod record;
pub mod shutdown;

// Re-exports for convenience
pub use http::{
    ApiClient, ApiError, Credentials, HttpConfig, Query, SHARED_RUNTIME, http_client, http_config,
    parse_body, set_http_config,
};
pub use logging::{IndicatifLogger, Verbosity, init_logging};
pub use progress::{ProgressContext, SharedProgress, fmt_num, report_page};
pub use record::{
    LOCATION_FIELDS, LocationPoint, Record, coordinate_pair, coordinate_values, first_present,
    location_points, point_coordinate_values, raw_points, records_from_value, scalar_text,
};
pub use shutdown::{install_signal_handlers, is_shutdown_requested, should_stop};
pub use tokio_util::sync::CancellationToken;
