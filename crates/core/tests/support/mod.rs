//! Shared test helpers for `bookingsync-core` integration tests.
//!
//! In-memory fakes for the store and calendar ports plus a fixed clock, so
//! engine and service tests can focus on behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod calendar;
pub mod repositories;

use std::sync::Arc;

use bookingsync_core::{
    BookingReconciler, BookingService, Clock, ReconcileSettings, WatchChannelManager,
    WatchSettings,
};
use chrono::{DateTime, TimeZone, Utc};

pub use calendar::{appointment_event, ScriptedCalendarGateway};
pub use repositories::MockBookingStore;

pub const CALENDAR_ID: &str = "owner@example.com";
pub const SERVICE_ACCOUNT: &str = "svc@project.iam.gserviceaccount.com";

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub fn reconcile_settings() -> ReconcileSettings {
    ReconcileSettings {
        calendar_id: Some(CALENDAR_ID.to_string()),
        service_account_email: Some(SERVICE_ACCOUNT.to_string()),
        ..ReconcileSettings::default()
    }
}

pub fn watch_settings() -> WatchSettings {
    WatchSettings {
        calendar_id: Some(CALENDAR_ID.to_string()),
        webhook_address: Some("https://bookings.example.com/calendar/webhook".to_string()),
        ..WatchSettings::default()
    }
}

pub fn reconciler(store: &MockBookingStore, calendar: &ScriptedCalendarGateway) -> BookingReconciler {
    BookingReconciler::new(
        Arc::new(store.clone()),
        Arc::new(calendar.clone()),
        Arc::new(FixedClock(fixed_now())),
        reconcile_settings(),
    )
}

pub fn service_at(
    store: &MockBookingStore,
    calendar: &ScriptedCalendarGateway,
    now: DateTime<Utc>,
) -> BookingService {
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(now));
    let reconciler = BookingReconciler::new(
        Arc::new(store.clone()),
        Arc::new(calendar.clone()),
        clock.clone(),
        reconcile_settings(),
    );
    let watch = WatchChannelManager::new(Arc::new(calendar.clone()), watch_settings());
    BookingService::new(Arc::new(store.clone()), Arc::new(reconciler), Arc::new(watch), clock)
}

pub fn service(store: &MockBookingStore, calendar: &ScriptedCalendarGateway) -> BookingService {
    service_at(store, calendar, fixed_now())
}
