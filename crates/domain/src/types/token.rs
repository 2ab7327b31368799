//! Booking token claims

use serde::{Deserialize, Serialize};

/// Payload of a signed booking token. Not persisted server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingTokenClaims {
    pub email: String,
    /// Expiry, unix seconds.
    pub exp: i64,
}
