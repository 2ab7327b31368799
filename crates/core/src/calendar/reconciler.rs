//! Booking reconciliation engine
//!
//! Walks the calendar's event listing (full or incremental), picks out
//! appointment-set bookings and marks each guest's profile as booked. Every
//! write is idempotent: re-applying the same event leaves profiles unchanged
//! and the audit log de-duplicates on `(email, external_event_id)`.

use std::sync::Arc;

use bookingsync_domain::constants::{
    CANCELLED_EVENT_STATUS, DEFAULT_APPOINTMENT_SET_KEY, EVENTS_PAGE_SIZE,
};
use bookingsync_domain::{
    resolve_first_booked_at, BookingError, BookingEvent, BookingEventType, BookingProfile,
    BookingSource, CalendarEvent, Result, SyncMode, SyncOutcome, WatchState,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use super::matching::{booking_timestamp, AppointmentMatcher};
use super::ports::{CalendarGateway, EventListQuery, ListEventsOutcome};
use crate::booking::ports::BookingStore;
use crate::clock::Clock;

/// Static inputs to a reconciliation pass.
#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    pub calendar_id: Option<String>,
    pub appointment_set_key: String,
    /// Service account identity, excluded from guest lists.
    pub service_account_email: Option<String>,
    pub page_size: u32,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            calendar_id: None,
            appointment_set_key: DEFAULT_APPOINTMENT_SET_KEY.to_string(),
            service_account_email: None,
            page_size: EVENTS_PAGE_SIZE,
        }
    }
}

impl ReconcileSettings {
    pub(crate) fn require_calendar_id(&self) -> Result<&str> {
        self.calendar_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| BookingError::Config("Missing GOOGLE_CALENDAR_ID secret".into()))
    }
}

#[derive(Debug, Default)]
struct Counters {
    events_seen: usize,
    events_matched: usize,
    profiles_updated: usize,
}

/// Reconciles calendar bookings into booking profiles.
pub struct BookingReconciler {
    store: Arc<dyn BookingStore>,
    calendar: Arc<dyn CalendarGateway>,
    clock: Arc<dyn Clock>,
    settings: ReconcileSettings,
}

impl BookingReconciler {
    pub fn new(
        store: Arc<dyn BookingStore>,
        calendar: Arc<dyn CalendarGateway>,
        clock: Arc<dyn Clock>,
        settings: ReconcileSettings,
    ) -> Self {
        Self { store, calendar, clock, settings }
    }

    pub fn settings(&self) -> &ReconcileSettings {
        &self.settings
    }

    /// Run one reconciliation pass.
    ///
    /// Incremental when `state` carries a cursor and `force_full_sync` is
    /// false. An expired cursor restarts the pass as a full listing and sets
    /// `expired_sync_token` on the outcome.
    #[instrument(skip(self, state, source), fields(source = %source))]
    pub async fn sync(
        &self,
        state: Option<&WatchState>,
        source: &BookingSource,
        force_full_sync: bool,
    ) -> Result<SyncOutcome> {
        let calendar_id = self.settings.require_calendar_id()?.to_string();
        let matcher = self.matcher(&calendar_id);

        let mut cursor = if force_full_sync {
            None
        } else {
            state.and_then(WatchState::sync_cursor).map(str::to_owned)
        };
        let mut expired_sync_token = false;
        let mut counters = Counters::default();

        'pass: loop {
            let mode = if cursor.is_some() { SyncMode::Incremental } else { SyncMode::Full };
            let mut page_token: Option<String> = None;
            debug!(%mode, calendar_id = %calendar_id, "Starting calendar reconciliation pass");

            loop {
                let query = EventListQuery {
                    calendar_id: calendar_id.clone(),
                    sync_token: cursor.clone(),
                    page_token: page_token.take(),
                    show_deleted: mode == SyncMode::Incremental,
                    max_results: self.settings.page_size,
                };

                let page = match self.calendar.list_events(&query).await? {
                    ListEventsOutcome::Page(page) => page,
                    ListEventsOutcome::CursorExpired if mode == SyncMode::Incremental => {
                        warn!("Calendar sync cursor expired; restarting with a full sync");
                        cursor = None;
                        expired_sync_token = true;
                        continue 'pass;
                    }
                    ListEventsOutcome::CursorExpired => {
                        return Err(BookingError::Sync(
                            "Google Calendar rejected a full sync request as expired".into(),
                        ));
                    }
                };

                counters.events_seen += page.events.len();
                for event in &page.events {
                    let updated = self.apply_event(&matcher, event, source).await?;
                    if updated > 0 {
                        counters.events_matched += 1;
                        counters.profiles_updated += updated;
                    }
                }

                if let Some(next) = page.next_page_token.filter(|token| !token.is_empty()) {
                    page_token = Some(next);
                    continue;
                }

                let next_sync_token =
                    page.next_sync_token.filter(|token| !token.is_empty()).ok_or_else(|| {
                        BookingError::Sync("Google Calendar sync did not return nextSyncToken".into())
                    })?;

                info!(
                    %mode,
                    expired_sync_token,
                    events_seen = counters.events_seen,
                    events_matched = counters.events_matched,
                    profiles_updated = counters.profiles_updated,
                    "Calendar reconciliation complete"
                );

                return Ok(SyncOutcome {
                    next_sync_token,
                    mode,
                    expired_sync_token,
                    events_seen: counters.events_seen,
                    events_matched: counters.events_matched,
                    profiles_updated: counters.profiles_updated,
                });
            }
        }
    }

    fn matcher(&self, calendar_id: &str) -> AppointmentMatcher {
        let excluded =
            std::iter::once(calendar_id).chain(self.settings.service_account_email.as_deref());
        AppointmentMatcher::new(self.settings.appointment_set_key.clone(), excluded)
    }

    /// Apply one event; returns the number of guest profiles written.
    async fn apply_event(
        &self,
        matcher: &AppointmentMatcher,
        event: &CalendarEvent,
        source: &BookingSource,
    ) -> Result<usize> {
        let Some(event_id) = event.event_id() else {
            return Ok(0);
        };
        if event.status.as_deref() == Some(CANCELLED_EVENT_STATUS) {
            return Ok(0);
        }
        if !matcher.is_appointment(event) {
            return Ok(0);
        }

        let guests = matcher.guest_emails(event);
        if guests.is_empty() {
            debug!(event_id, "Appointment has no eligible guests");
            return Ok(0);
        }

        let hint = booking_timestamp(event);
        for email in &guests {
            self.mark_profile_booked(email, source, hint).await?;
            self.record_booking_event(email, event_id, event, source).await?;
        }
        Ok(guests.len())
    }

    async fn mark_profile_booked(
        &self,
        email: &str,
        source: &BookingSource,
        hint: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let now = self.clock.now();
        let existing = self.store.find_profile(email).await?;
        let first_booked_at =
            resolve_first_booked_at(existing.and_then(|profile| profile.first_booked_at), hint, now);
        self.store
            .upsert_profile(&BookingProfile::booked(email, source.clone(), first_booked_at, now))
            .await
    }

    async fn record_booking_event(
        &self,
        email: &str,
        event_id: &str,
        event: &CalendarEvent,
        source: &BookingSource,
    ) -> Result<()> {
        let now = self.clock.now();
        let metadata = json!({
            "google_event_id": event_id,
            "summary": event.summary.as_deref().unwrap_or_default(),
            "html_link": event.html_link.as_deref().unwrap_or_default(),
            "start": event.start,
            "end": event.end,
            "organizer": event.organizer_email.as_deref().unwrap_or_default(),
            "creator": event.creator_email.as_deref().unwrap_or_default(),
            "observed_at": now.to_rfc3339(),
        });
        let record = BookingEvent::new(email, BookingEventType::Confirmed, source.clone(), now)
            .with_event_id(event_id)
            .with_metadata(metadata);

        if self.store.insert_event(&record).await?.is_duplicate() {
            debug!(event_id, "Booking event already recorded");
        }
        Ok(())
    }
}
