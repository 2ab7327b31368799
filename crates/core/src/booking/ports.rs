//! Port interfaces for booking persistence

use async_trait::async_trait;
use bookingsync_domain::{BookingEvent, BookingProfile, Result, WatchState};
use chrono::{DateTime, Utc};

/// Result of an insert guarded by a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The row already existed; nothing was written.
    Duplicate,
}

impl InsertOutcome {
    pub const fn is_duplicate(self) -> bool {
        matches!(self, Self::Duplicate)
    }
}

/// Storage for booking profiles, the booking audit log and the single watch
/// state row.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Look up a profile by normalized email.
    async fn find_profile(&self, email: &str) -> Result<Option<BookingProfile>>;

    /// Insert a profile that must not exist yet.
    async fn insert_profile(&self, profile: &BookingProfile) -> Result<InsertOutcome>;

    /// Insert or update a profile keyed by email.
    ///
    /// When the stored row already carries a `first_booked_at`, that value is
    /// kept and the incoming one is ignored.
    async fn upsert_profile(&self, profile: &BookingProfile) -> Result<()>;

    /// Append an audit event. Duplicates of `(email, external_event_id)` or
    /// `(email, event_type, external_session_id)` report
    /// [`InsertOutcome::Duplicate`].
    async fn insert_event(&self, event: &BookingEvent) -> Result<InsertOutcome>;

    async fn load_watch_state(&self) -> Result<Option<WatchState>>;

    /// Replace the watch state row.
    async fn save_watch_state(&self, state: &WatchState) -> Result<()>;

    /// Stamp `last_notification_at` on the existing watch state row.
    async fn mark_watch_notification(&self, at: DateTime<Utc>) -> Result<()>;

    /// Cheap connectivity probe for health checks.
    async fn health_check(&self) -> Result<()>;
}
