//! HTTP error boundary
//!
//! Every handler failure becomes a JSON body `{"error": "<message>"}` with a
//! status derived from the error kind.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bookingsync_domain::BookingError;
use serde_json::json;
use thiserror::Error;

use crate::utils::logging::log_error_response;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error("Not found")]
    NotFound,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Booking(err) => match err {
                BookingError::Authorization(_) => StatusCode::UNAUTHORIZED,
                BookingError::InvalidSignature(_) | BookingError::Validation(_) => {
                    StatusCode::BAD_REQUEST
                }
                BookingError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
                BookingError::Credential(_)
                | BookingError::Sync(_)
                | BookingError::Channel(_)
                | BookingError::Database(_)
                | BookingError::Network(_)
                | BookingError::Config(_)
                | BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Booking(err) => err.label(),
            Self::NotFound => "not_found",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        log_error_response(status, self.label(), &self.to_string());
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
