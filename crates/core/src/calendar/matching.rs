//! Appointment-set filtering and guest extraction

use std::collections::HashSet;

use bookingsync_domain::constants::APPOINTMENT_SET_PROPERTY_KEYS;
use bookingsync_domain::{normalized_valid_email, CalendarEvent};
use chrono::{DateTime, Utc};

/// Decides which events are bookings and who booked them.
#[derive(Debug, Clone)]
pub struct AppointmentMatcher {
    appointment_set_key: String,
    excluded: HashSet<String>,
}

impl AppointmentMatcher {
    /// `excluded` addresses (calendar owner, service account) are normalized
    /// before comparison; blank entries are dropped.
    pub fn new<I, S>(appointment_set_key: impl Into<String>, excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let excluded = excluded
            .into_iter()
            .map(|email| email.as_ref().trim().to_lowercase())
            .filter(|email| !email.is_empty())
            .collect();
        Self { appointment_set_key: appointment_set_key.into(), excluded }
    }

    /// True when either appointment-set property key names the configured set.
    pub fn is_appointment(&self, event: &CalendarEvent) -> bool {
        APPOINTMENT_SET_PROPERTY_KEYS.iter().any(|key| {
            event.shared_properties.get(*key).map(String::as_str)
                == Some(self.appointment_set_key.as_str())
        })
    }

    /// Valid, normalized, de-duplicated attendee emails in listing order,
    /// excluding the calendar owner and the service account.
    pub fn guest_emails(&self, event: &CalendarEvent) -> Vec<String> {
        let mut seen = HashSet::new();
        event
            .attendees
            .iter()
            .filter_map(|raw| normalized_valid_email(Some(raw.as_str())))
            .filter(|email| !self.excluded.contains(email))
            .filter(|email| seen.insert(email.clone()))
            .collect()
    }
}

/// Best available booking instant: created, then updated, then start.
pub fn booking_timestamp(event: &CalendarEvent) -> Option<DateTime<Utc>> {
    event.created.or(event.updated).or_else(|| event.start_instant())
}
