//! Origin allow-list CORS
//!
//! Allowed origins are reflected; every other caller (including requests
//! without an `Origin`) receives the default origin. Preflight requests are
//! answered here and never reach a handler.

use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN, VARY,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use bookingsync_domain::{BookingError, Result, ServerConfig};

use crate::context::AppState;

const ALLOW_HEADERS: &str =
    "content-type, authorization, x-client-info, apikey, x-booking-token, stripe-signature";
const ALLOW_METHODS: &str = "GET, POST, OPTIONS";

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
    default_origin: HeaderValue,
}

impl CorsPolicy {
    pub fn new(allowed_origins: Vec<String>, default_origin: &str) -> Result<Self> {
        let default_origin = HeaderValue::from_str(default_origin).map_err(|err| {
            BookingError::Config(format!("Invalid default origin {default_origin:?}: {err}"))
        })?;
        Ok(Self { allowed_origins, default_origin })
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        Self::new(config.allowed_origins.clone(), &config.default_origin)
    }

    /// Origin to echo back for a request carrying `origin`.
    pub fn resolve_origin(&self, origin: Option<&HeaderValue>) -> HeaderValue {
        origin
            .filter(|origin| {
                origin
                    .to_str()
                    .is_ok_and(|value| self.allowed_origins.iter().any(|allowed| allowed == value))
            })
            .cloned()
            .unwrap_or_else(|| self.default_origin.clone())
    }

    fn apply(&self, origin: HeaderValue, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
        headers.insert(VARY, HeaderValue::from_static("Origin"));
    }
}

/// Attach CORS headers to every response; short-circuit `OPTIONS`.
pub async fn cors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let origin = state.cors.resolve_origin(request.headers().get(ORIGIN));

    let mut response = if request.method() == Method::OPTIONS {
        (StatusCode::OK, "ok").into_response()
    } else {
        next.run(request).await
    };

    state.cors.apply(origin, response.headers_mut());
    response
}
