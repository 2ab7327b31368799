//! Scripted `CalendarGateway` for testing
//!
//! Listing responses are queued up front and consumed in order; every call
//! is recorded so tests can assert on the queries the engine issued.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use bookingsync_core::{
    CalendarGateway, EventListQuery, ListEventsOutcome, StopOutcome, WatchRegistration,
    WatchRequest,
};
use bookingsync_domain::{BookingError, CalendarEvent, EventPage, Result as DomainResult};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

struct GatewayState {
    listings: VecDeque<DomainResult<ListEventsOutcome>>,
    queries: Vec<EventListQuery>,
    registration: DomainResult<WatchRegistration>,
    watches: Vec<WatchRequest>,
    stop_outcome: StopOutcome,
    stops: Vec<(String, String)>,
}

#[derive(Clone)]
pub struct ScriptedCalendarGateway {
    state: Arc<Mutex<GatewayState>>,
}

impl Default for ScriptedCalendarGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedCalendarGateway {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(GatewayState {
                listings: VecDeque::new(),
                queries: Vec::new(),
                registration: Ok(WatchRegistration {
                    resource_id: Some("resource-1".into()),
                    expiration: None,
                }),
                watches: Vec::new(),
                stop_outcome: StopOutcome::Stopped,
                stops: Vec::new(),
            })),
        }
    }

    /// Queue a page of events.
    pub fn with_page(
        self,
        events: Vec<CalendarEvent>,
        next_page_token: Option<&str>,
        next_sync_token: Option<&str>,
    ) -> Self {
        let page = EventPage {
            events,
            next_page_token: next_page_token.map(str::to_string),
            next_sync_token: next_sync_token.map(str::to_string),
        };
        self.state.lock().listings.push_back(Ok(ListEventsOutcome::Page(page)));
        self
    }

    pub fn with_cursor_expired(self) -> Self {
        self.state.lock().listings.push_back(Ok(ListEventsOutcome::CursorExpired));
        self
    }

    pub fn with_listing_error(self, message: &str) -> Self {
        self.state.lock().listings.push_back(Err(BookingError::Sync(message.to_string())));
        self
    }

    pub fn with_registration(self, registration: DomainResult<WatchRegistration>) -> Self {
        self.state.lock().registration = registration;
        self
    }

    pub fn with_stop_outcome(self, outcome: StopOutcome) -> Self {
        self.state.lock().stop_outcome = outcome;
        self
    }

    pub fn queries(&self) -> Vec<EventListQuery> {
        self.state.lock().queries.clone()
    }

    pub fn watches(&self) -> Vec<WatchRequest> {
        self.state.lock().watches.clone()
    }

    pub fn stops(&self) -> Vec<(String, String)> {
        self.state.lock().stops.clone()
    }
}

#[async_trait]
impl CalendarGateway for ScriptedCalendarGateway {
    async fn list_events(&self, query: &EventListQuery) -> DomainResult<ListEventsOutcome> {
        let mut state = self.state.lock();
        state.queries.push(query.clone());
        state
            .listings
            .pop_front()
            .unwrap_or_else(|| Err(BookingError::Sync("no scripted listing left".into())))
    }

    async fn watch_events(&self, request: &WatchRequest) -> DomainResult<WatchRegistration> {
        let mut state = self.state.lock();
        state.watches.push(request.clone());
        state.registration.clone()
    }

    async fn stop_channel(&self, channel_id: &str, resource_id: &str) -> DomainResult<StopOutcome> {
        let mut state = self.state.lock();
        state.stops.push((channel_id.to_string(), resource_id.to_string()));
        Ok(state.stop_outcome)
    }
}

/// An appointment-set event with the given attendees.
pub fn appointment_event(id: &str, attendees: &[&str]) -> CalendarEvent {
    CalendarEvent {
        id: Some(id.to_string()),
        status: Some("confirmed".into()),
        summary: Some("Consultation".into()),
        attendees: attendees.iter().map(|email| email.to_string()).collect(),
        shared_properties: HashMap::from([(
            "goo.createdBySet".to_string(),
            "default_cita".to_string(),
        )]),
        ..CalendarEvent::default()
    }
}

pub fn created_at(event: CalendarEvent, created: DateTime<Utc>) -> CalendarEvent {
    CalendarEvent { created: Some(created), ..event }
}
