//! Conversions from external infrastructure errors into domain errors.

use bookingsync_domain::BookingError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// SQLite extended result codes for uniqueness violations.
const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;
const SQLITE_CONSTRAINT_PRIMARYKEY: i32 = 1555;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub BookingError);

impl From<InfraError> for BookingError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<BookingError> for InfraError {
    fn from(value: BookingError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoBookingError {
    fn into_booking(self) -> BookingError;
}

/// True when `err` is a unique or primary-key constraint violation.
pub fn is_unique_violation(err: &SqlError) -> bool {
    matches!(
        err,
        SqlError::SqliteFailure(failure, _)
            if failure.code == rusqlite::ffi::ErrorCode::ConstraintViolation
                && matches!(
                    failure.extended_code,
                    SQLITE_CONSTRAINT_UNIQUE | SQLITE_CONSTRAINT_PRIMARYKEY
                )
    )
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → BookingError */
/* -------------------------------------------------------------------------- */

impl IntoBookingError for SqlError {
    fn into_booking(self) -> BookingError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        if is_unique_violation(&self) {
            return BookingError::Database("unique constraint violation".into());
        }

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => BookingError::Database("database is busy".into()),
                    ErrorCode::DatabaseLocked => {
                        BookingError::Database("database is locked".into())
                    }
                    _ => BookingError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => BookingError::Database("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                BookingError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                BookingError::Database(format!("invalid column type: {ty}"))
            }
            RE::InvalidPath(path) => BookingError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => BookingError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_booking())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → BookingError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(BookingError::Database(format!("connection pool error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → BookingError */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(BookingError::Internal(format!("JSON serialization failed: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → BookingError */
/* -------------------------------------------------------------------------- */

impl IntoBookingError for HttpError {
    fn into_booking(self) -> BookingError {
        if self.is_timeout() {
            return BookingError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return BookingError::Network("HTTP connection failure".into());
        }

        if self.is_decode() {
            return BookingError::Network(format!("invalid HTTP response body: {self}"));
        }

        if let Some(status) = self.status() {
            return BookingError::Network(format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown status")
            ));
        }

        BookingError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_booking())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
