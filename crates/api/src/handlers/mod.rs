//! Request handlers
//!
//! Handlers frame requests for [`bookingsync_core::BookingService`] and shape
//! its results into JSON; no booking rules live here.

pub mod booking;
pub mod calendar;
pub mod health;
pub mod stripe;

use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bookingsync_domain::BookingError;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::AppContext;
use crate::error::{ApiError, ApiResult};
use crate::utils::token_transport::token_cookie;

/// Parse a JSON body, treating an empty or malformed body as `T::default()`.
pub(crate) fn lenient_json<T: DeserializeOwned + Default>(body: &[u8]) -> T {
    serde_json::from_slice(body).unwrap_or_default()
}

/// JSON response that also sets `token` as the booking token cookie.
pub(crate) fn with_token_cookie(
    ctx: &AppContext,
    token: &str,
    payload: Value,
) -> ApiResult<Response> {
    let cookie = token_cookie(token, ctx.tokens.ttl_seconds())?;
    Ok(([(SET_COOKIE, cookie)], Json(payload)).into_response())
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::from(BookingError::MethodNotAllowed)
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
