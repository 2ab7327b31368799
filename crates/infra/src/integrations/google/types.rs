//! Google Calendar and OAuth wire formats

use std::collections::HashMap;

use bookingsync_domain::{CalendarEvent, EventPage, EventTime};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventsResponse {
    #[serde(default)]
    pub items: Vec<GoogleEvent>,
    pub next_page_token: Option<String>,
    pub next_sync_token: Option<String>,
}

impl From<EventsResponse> for EventPage {
    fn from(response: EventsResponse) -> Self {
        Self {
            events: response.items.into_iter().map(CalendarEvent::from).collect(),
            next_page_token: response.next_page_token,
            next_sync_token: response.next_sync_token,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GoogleEvent {
    pub id: Option<String>,
    pub status: Option<String>,
    pub summary: Option<String>,
    pub html_link: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
    pub organizer: Option<Person>,
    pub creator: Option<Person>,
    #[serde(default)]
    pub attendees: Vec<Person>,
    pub extended_properties: Option<ExtendedProperties>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Person {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ExtendedProperties {
    #[serde(default)]
    pub shared: HashMap<String, String>,
}

impl From<GoogleEvent> for CalendarEvent {
    fn from(event: GoogleEvent) -> Self {
        Self {
            id: event.id,
            status: event.status,
            summary: event.summary,
            html_link: event.html_link,
            created: parse_timestamp(event.created.as_deref()),
            updated: parse_timestamp(event.updated.as_deref()),
            start: event.start,
            end: event.end,
            organizer_email: event.organizer.and_then(|person| person.email),
            creator_email: event.creator.and_then(|person| person.email),
            attendees: event.attendees.into_iter().filter_map(|person| person.email).collect(),
            shared_properties: event
                .extended_properties
                .map(|properties| properties.shared)
                .unwrap_or_default(),
        }
    }
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value?).ok().map(|at| at.with_timezone(&Utc))
}

#[derive(Debug, Serialize)]
pub(crate) struct WatchBody<'a> {
    pub id: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub address: &'a str,
    pub token: &'a str,
    pub params: WatchParams,
}

#[derive(Debug, Serialize)]
pub(crate) struct WatchParams {
    pub ttl: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WatchResponse {
    pub resource_id: Option<String>,
    /// Epoch millis; documented as a string, tolerated as a number.
    pub expiration: Option<Value>,
}

impl WatchResponse {
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        let millis = match self.expiration.as_ref()? {
            Value::String(raw) => raw.trim().parse::<i64>().ok()?,
            Value::Number(number) => number.as_i64()?,
            _ => return None,
        };
        DateTime::from_timestamp_millis(millis)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StopBody<'a> {
    pub id: &'a str,
    pub resource_id: &'a str,
}

/// Error envelope returned by the Calendar API.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub message: Option<String>,
}

impl ApiErrorResponse {
    pub fn message(self) -> Option<String> {
        self.error.and_then(|body| body.message).filter(|message| !message.trim().is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: Option<String>,
    pub expires_in: Option<i64>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn event_maps_attendees_and_shared_properties() {
        let raw = json!({
            "id": "evt-1",
            "status": "confirmed",
            "created": "2025-05-01T09:00:00.000Z",
            "start": { "dateTime": "2025-05-10T15:00:00-04:00" },
            "organizer": { "email": "owner@example.com" },
            "attendees": [{ "email": "guest@example.com" }, { "displayName": "No email" }],
            "extendedProperties": { "shared": { "goo.createdBySet": "default_cita" } }
        });

        let event: CalendarEvent = serde_json::from_value::<GoogleEvent>(raw).unwrap().into();
        assert_eq!(event.attendees, vec!["guest@example.com".to_string()]);
        assert_eq!(event.organizer_email.as_deref(), Some("owner@example.com"));
        assert_eq!(event.shared_properties["goo.createdBySet"], "default_cita");
        assert_eq!(event.created.unwrap().to_rfc3339(), "2025-05-01T09:00:00+00:00");
    }

    #[test]
    fn watch_expiration_accepts_string_or_number() {
        let as_string = WatchResponse { resource_id: None, expiration: Some(json!("1748779200000")) };
        let as_number = WatchResponse { resource_id: None, expiration: Some(json!(1_748_779_200_000_i64)) };
        assert_eq!(as_string.expiration(), as_number.expiration());
        assert_eq!(as_string.expiration().unwrap().to_rfc3339(), "2025-06-01T12:00:00+00:00");
    }

    #[test]
    fn blank_api_error_message_is_ignored() {
        let response: ApiErrorResponse =
            serde_json::from_value(json!({ "error": { "message": " " } })).unwrap();
        assert_eq!(response.message(), None);
    }
}
