//! Booking token transport
//!
//! Clients send the token in the `x-booking-token` header (cross-origin
//! fallback) or the `bookingToken` cookie; the header wins. Responses that
//! issue a token also set the cookie.

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use bookingsync_domain::constants::{BOOKING_TOKEN_COOKIE, BOOKING_TOKEN_HEADER};
use bookingsync_domain::{BookingError, Result};

/// Raw token from the request, if any.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    header_token(headers).or_else(|| read_cookie(headers, BOOKING_TOKEN_COOKIE))
}

fn header_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(BOOKING_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// Value of cookie `name`, percent-decoded.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
        .map(|raw| urlencoding::decode(raw).map_or_else(|_| raw.to_string(), |value| value.into_owned()))
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value carrying `token` for `max_age_seconds`.
pub fn token_cookie(token: &str, max_age_seconds: i64) -> Result<HeaderValue> {
    let cookie = format!(
        "{BOOKING_TOKEN_COOKIE}={}; Max-Age={max_age_seconds}; Path=/; HttpOnly; Secure; SameSite=Lax",
        urlencoding::encode(token)
    );
    HeaderValue::from_str(&cookie)
        .map_err(|err| BookingError::Internal(format!("Invalid booking token cookie: {err}")))
}
