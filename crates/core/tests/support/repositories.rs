//! In-memory `BookingStore` for testing
//!
//! Mirrors the uniqueness and first-booked-at rules of the real stores so
//! idempotence can be asserted without a database.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bookingsync_core::{BookingStore, InsertOutcome};
use bookingsync_domain::{BookingEvent, BookingProfile, Result as DomainResult, WatchState};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

#[derive(Default)]
struct StoreState {
    profiles: HashMap<String, BookingProfile>,
    events: Vec<BookingEvent>,
    watch: Option<WatchState>,
    writes: usize,
}

/// Shared in-memory store; clones observe the same data.
#[derive(Default, Clone)]
pub struct MockBookingStore {
    state: Arc<Mutex<StoreState>>,
}

impl MockBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(self, profile: BookingProfile) -> Self {
        self.state.lock().profiles.insert(profile.email.clone(), profile);
        self
    }

    pub fn with_watch_state(self, watch: WatchState) -> Self {
        self.state.lock().watch = Some(watch);
        self
    }

    pub fn profile(&self, email: &str) -> Option<BookingProfile> {
        self.state.lock().profiles.get(email).cloned()
    }

    pub fn profile_count(&self) -> usize {
        self.state.lock().profiles.len()
    }

    pub fn events(&self) -> Vec<BookingEvent> {
        self.state.lock().events.clone()
    }

    pub fn watch_state(&self) -> Option<WatchState> {
        self.state.lock().watch.clone()
    }

    /// Number of mutating calls that changed stored data.
    pub fn writes(&self) -> usize {
        self.state.lock().writes
    }
}

fn same_key(a: Option<&String>, b: Option<&String>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

#[async_trait]
impl BookingStore for MockBookingStore {
    async fn find_profile(&self, email: &str) -> DomainResult<Option<BookingProfile>> {
        Ok(self.profile(email))
    }

    async fn insert_profile(&self, profile: &BookingProfile) -> DomainResult<InsertOutcome> {
        let mut state = self.state.lock();
        if state.profiles.contains_key(&profile.email) {
            return Ok(InsertOutcome::Duplicate);
        }
        state.profiles.insert(profile.email.clone(), profile.clone());
        state.writes += 1;
        Ok(InsertOutcome::Inserted)
    }

    async fn upsert_profile(&self, profile: &BookingProfile) -> DomainResult<()> {
        let mut state = self.state.lock();
        let mut next = profile.clone();
        if let Some(existing) = state.profiles.get(&profile.email) {
            next.first_booked_at = existing.first_booked_at.or(profile.first_booked_at);
        }
        state.profiles.insert(next.email.clone(), next);
        state.writes += 1;
        Ok(())
    }

    async fn insert_event(&self, event: &BookingEvent) -> DomainResult<InsertOutcome> {
        let mut state = self.state.lock();
        let duplicate = state.events.iter().any(|existing| {
            existing.email == event.email
                && (same_key(existing.external_event_id.as_ref(), event.external_event_id.as_ref())
                    || (existing.event_type == event.event_type
                        && same_key(
                            existing.external_session_id.as_ref(),
                            event.external_session_id.as_ref(),
                        )))
        });
        if duplicate {
            return Ok(InsertOutcome::Duplicate);
        }
        state.events.push(event.clone());
        state.writes += 1;
        Ok(InsertOutcome::Inserted)
    }

    async fn load_watch_state(&self) -> DomainResult<Option<WatchState>> {
        Ok(self.watch_state())
    }

    async fn save_watch_state(&self, watch: &WatchState) -> DomainResult<()> {
        let mut state = self.state.lock();
        state.watch = Some(watch.clone());
        state.writes += 1;
        Ok(())
    }

    async fn mark_watch_notification(&self, at: DateTime<Utc>) -> DomainResult<()> {
        let mut state = self.state.lock();
        if let Some(watch) = state.watch.as_mut() {
            watch.last_notification_at = Some(at);
            state.writes += 1;
        }
        Ok(())
    }

    async fn health_check(&self) -> DomainResult<()> {
        Ok(())
    }
}
