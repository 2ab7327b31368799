//! Booking profile: one row per normalised email

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::source::BookingSource;

/// Durable record of whether an email has ever completed a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingProfile {
    /// Normalised email, the unique key.
    pub email: String,
    pub has_booked: bool,
    /// Earliest known booking confirmation. Set once, never moved.
    pub first_booked_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub source: BookingSource,
}

impl BookingProfile {
    /// A profile that exists but has not booked yet.
    pub fn unbooked(email: impl Into<String>, source: BookingSource, now: DateTime<Utc>) -> Self {
        Self { email: email.into(), has_booked: false, first_booked_at: None, updated_at: now, source }
    }

    /// A booked profile. `first_booked_at` must already be resolved against
    /// any existing row.
    pub fn booked(
        email: impl Into<String>,
        source: BookingSource,
        first_booked_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            email: email.into(),
            has_booked: true,
            first_booked_at: Some(first_booked_at),
            updated_at: now,
            source,
        }
    }
}

/// Pick the `first_booked_at` to write: an existing value always wins over
/// the hint, the hint wins over `now`.
pub fn resolve_first_booked_at(
    existing: Option<DateTime<Utc>>,
    hint: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    existing.or(hint).unwrap_or(now)
}
