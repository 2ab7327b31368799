//! Append-only booking audit log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::source::BookingSource;
use crate::impl_wire_enum_conversions;

/// Kind of audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingEventType {
    #[serde(rename = "booking.intake")]
    Intake,
    #[serde(rename = "booking.confirmed")]
    Confirmed,
    #[serde(rename = "stripe.checkout.session.completed")]
    StripeSessionCompleted,
    #[serde(rename = "stripe.payment_intent.succeeded")]
    StripePaymentSucceeded,
}

impl_wire_enum_conversions!(BookingEventType {
    Intake => "booking.intake",
    Confirmed => "booking.confirmed",
    StripeSessionCompleted => "stripe.checkout.session.completed",
    StripePaymentSucceeded => "stripe.payment_intent.succeeded",
});

/// One audit log entry.
///
/// Insertion is idempotent per `(email, external_event_id)` and per
/// `(email, external_session_id)`; stores report a repeat as a duplicate
/// rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingEvent {
    pub email: String,
    pub event_type: BookingEventType,
    pub source: BookingSource,
    pub external_session_id: Option<String>,
    /// Calendar event id, used for de-duplication.
    pub external_event_id: Option<String>,
    pub metadata: Value,
    pub observed_at: DateTime<Utc>,
}

impl BookingEvent {
    pub fn new(
        email: impl Into<String>,
        event_type: BookingEventType,
        source: BookingSource,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            email: email.into(),
            event_type,
            source,
            external_session_id: None,
            external_event_id: None,
            metadata: Value::Object(serde_json::Map::new()),
            observed_at,
        }
    }

    pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
        self.external_session_id = session_id;
        self
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.external_event_id = Some(event_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}
