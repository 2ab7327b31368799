use axum::http::StatusCode;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,bookingsync=debug";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter. `BOOKING_LOG_FORMAT=json`
/// switches to structured JSON lines.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var("BOOKING_LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter).with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

/// Log an error response with a stable error label.
///
/// Client errors are warnings; server errors are errors. Callers must not
/// pass raw emails or secrets in `message`.
#[inline]
pub fn log_error_response(status: StatusCode, error_type: &str, message: &str) {
    let status = status.as_u16();
    if status >= 500 {
        error!(status, error_type, message, "request_failed");
    } else {
        warn!(status, error_type, message, "request_rejected");
    }
}
