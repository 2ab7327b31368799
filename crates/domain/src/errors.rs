//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for bookingsync
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum BookingError {
    /// Service-account secrets missing/invalid or the token exchange failed.
    #[error("Credential error: {0}")]
    Credential(String),

    /// Non-recoverable provider failure while listing events.
    #[error("{0}")]
    Sync(String),

    /// Watch channel registration or deregistration failed.
    #[error("{0}")]
    Channel(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    InvalidSignature(String),

    #[error("{0}")]
    Validation(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BookingError {
    /// Stable label suitable for structured logs.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Credential(_) => "credential",
            Self::Sync(_) => "sync",
            Self::Channel(_) => "channel",
            Self::Authorization(_) => "authorization",
            Self::InvalidSignature(_) => "invalid_signature",
            Self::Validation(_) => "validation",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::Database(_) => "database",
            Self::Network(_) => "network",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias for bookingsync operations
pub type Result<T> = std::result::Result<T, BookingError>;
