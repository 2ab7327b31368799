//! Provenance tags recorded on profiles and audit events

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Free-form provenance tag. Well-known values are exposed as constants;
/// callers such as the confirm endpoint may supply their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingSource(Cow<'static, str>);

impl BookingSource {
    pub const INTAKE: Self = Self(Cow::Borrowed("intake"));
    pub const WEBSITE: Self = Self(Cow::Borrowed("website"));
    pub const MANUAL_CONFIRM: Self = Self(Cow::Borrowed("manual_confirm"));
    pub const STRIPE_WEBHOOK: Self = Self(Cow::Borrowed("stripe_webhook"));
    pub const CALENDAR_SETUP: Self = Self(Cow::Borrowed("google_calendar_setup"));
    pub const CALENDAR_SYNC: Self = Self(Cow::Borrowed("google_calendar_sync"));
    pub const CALENDAR_WEBHOOK: Self = Self(Cow::Borrowed("google_calendar_webhook"));

    /// Build a caller-supplied tag.
    pub fn custom(value: impl Into<String>) -> Self {
        Self(Cow::Owned(value.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for BookingSource {
    fn from(value: String) -> Self {
        Self::custom(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_and_custom_tags_compare_by_value() {
        assert_eq!(BookingSource::custom("intake"), BookingSource::INTAKE);
        assert_eq!(BookingSource::CALENDAR_WEBHOOK.as_str(), "google_calendar_webhook");
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&BookingSource::STRIPE_WEBHOOK).unwrap();
        assert_eq!(json, "\"stripe_webhook\"");
        let parsed: BookingSource = serde_json::from_str("\"landing_page\"").unwrap();
        assert_eq!(parsed.as_str(), "landing_page");
    }
}
