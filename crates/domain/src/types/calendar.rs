//! Provider-independent calendar event model
//!
//! Adapters map the provider's wire format into these types; the
//! reconciliation engine only ever sees this shape.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Start or end of an event as reported by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// All-day events carry a bare `YYYY-MM-DD` date instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl EventTime {
    /// Resolve to an instant. All-day dates resolve to midnight UTC.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        if let Some(value) = self.date_time.as_deref() {
            return DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.with_timezone(&Utc));
        }
        let date = NaiveDate::parse_from_str(self.date.as_deref()?, "%Y-%m-%d").ok()?;
        Some(date.and_hms_opt(0, 0, 0)?.and_utc())
    }
}

/// A calendar event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: Option<String>,
    pub status: Option<String>,
    pub summary: Option<String>,
    pub html_link: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
    pub organizer_email: Option<String>,
    pub creator_email: Option<String>,
    /// Raw attendee addresses, unnormalised.
    pub attendees: Vec<String>,
    /// Provider "shared" extended properties.
    pub shared_properties: HashMap<String, String>,
}

impl CalendarEvent {
    /// Trimmed identifier, `None` if absent or blank.
    pub fn event_id(&self) -> Option<&str> {
        self.id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }

    pub fn start_instant(&self) -> Option<DateTime<Utc>> {
        self.start.as_ref().and_then(EventTime::instant)
    }
}

/// One page of an event listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPage {
    pub events: Vec<CalendarEvent>,
    pub next_page_token: Option<String>,
    pub next_sync_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn date_time_takes_precedence_and_converts_to_utc() {
        let time = EventTime {
            date_time: Some("2025-04-02T10:30:00-04:00".into()),
            date: Some("2025-01-01".into()),
        };
        assert_eq!(time.instant(), Some(Utc.with_ymd_and_hms(2025, 4, 2, 14, 30, 0).unwrap()));
    }

    #[test]
    fn all_day_date_resolves_to_midnight() {
        let time = EventTime { date_time: None, date: Some("2025-04-02".into()) };
        assert_eq!(time.instant(), Some(Utc.with_ymd_and_hms(2025, 4, 2, 0, 0, 0).unwrap()));
    }

    #[test]
    fn blank_id_is_treated_as_missing() {
        let event = CalendarEvent { id: Some("  ".into()), ..CalendarEvent::default() };
        assert_eq!(event.event_id(), None);
    }
}
