//! Port interfaces for the calendar provider

use async_trait::async_trait;
use bookingsync_domain::{EventPage, Result};
use chrono::{DateTime, Utc};

/// Parameters for one page of an event listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventListQuery {
    pub calendar_id: String,
    pub sync_token: Option<String>,
    pub page_token: Option<String>,
    pub show_deleted: bool,
    pub max_results: u32,
}

/// Result of listing events.
///
/// Fatal provider failures surface as `Err(BookingError::Sync)`; an expired
/// cursor is an expected outcome the caller recovers from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEventsOutcome {
    Page(EventPage),
    /// The provider rejected the incremental cursor.
    CursorExpired,
}

/// Request to register a push channel on a calendar's events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRequest {
    pub calendar_id: String,
    pub channel_id: String,
    pub channel_token: String,
    pub address: String,
    pub ttl_seconds: u64,
}

/// Provider response to a watch registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchRegistration {
    pub resource_id: Option<String>,
    pub expiration: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    /// Provider reported the channel as unknown or gone.
    AlreadyGone,
}

/// Calendar provider operations used by the reconciler and the watch manager.
#[async_trait]
pub trait CalendarGateway: Send + Sync {
    async fn list_events(&self, query: &EventListQuery) -> Result<ListEventsOutcome>;

    async fn watch_events(&self, request: &WatchRequest) -> Result<WatchRegistration>;

    /// Deregister a channel. Not-found and gone responses are not errors.
    async fn stop_channel(&self, channel_id: &str, resource_id: &str) -> Result<StopOutcome>;
}
