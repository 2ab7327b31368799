//! SQLite implementation of the booking store
//!
//! Profiles, the audit log and the singleton watch state live in one local
//! database. Blocking rusqlite calls run on the blocking thread pool.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use bookingsync_core::{BookingStore, InsertOutcome};
use bookingsync_domain::constants::WATCH_STATE_ID;
use bookingsync_domain::{
    BookingError, BookingEvent, BookingEventType, BookingProfile, BookingSource,
    Result as DomainResult, WatchState,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;

use super::manager::{map_sql_error, DbManager};
use crate::errors::{is_unique_violation, InfraError};

/// SQLite-backed implementation of [`BookingStore`].
pub struct SqliteBookingStore {
    db: Arc<DbManager>,
}

impl SqliteBookingStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Audit events recorded for `email`, oldest first.
    pub async fn events_for(&self, email: &str) -> DomainResult<Vec<BookingEvent>> {
        let db = Arc::clone(&self.db);
        let email = email.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<BookingEvent>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT email_normalized, event_type, source, stripe_session_id, google_event_id,
                            metadata, created_at
                     FROM booking_events WHERE email_normalized = ?1 ORDER BY id",
                )
                .map_err(map_sql_error)?;
            let rows = stmt.query_map(params![email], map_event_row).map_err(map_sql_error)?;
            let mut events = Vec::new();
            for row in rows {
                events.push(row.map_err(map_sql_error)?);
            }
            Ok(events)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl BookingStore for SqliteBookingStore {
    async fn find_profile(&self, email: &str) -> DomainResult<Option<BookingProfile>> {
        let db = Arc::clone(&self.db);
        let email = email.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<BookingProfile>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT email_normalized, has_booked, first_booked_at, updated_at, source
                 FROM booking_profiles WHERE email_normalized = ?1",
                params![email],
                map_profile_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn insert_profile(&self, profile: &BookingProfile) -> DomainResult<InsertOutcome> {
        let db = Arc::clone(&self.db);
        let profile = profile.clone();

        task::spawn_blocking(move || -> DomainResult<InsertOutcome> {
            let conn = db.get_connection()?;
            let result = conn.execute(
                "INSERT INTO booking_profiles (email_normalized, has_booked, first_booked_at, updated_at, source)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    profile.email,
                    profile.has_booked,
                    profile.first_booked_at.map(|at| at.timestamp_millis()),
                    profile.updated_at.timestamp_millis(),
                    profile.source.as_str(),
                ],
            );
            insert_outcome(result)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn upsert_profile(&self, profile: &BookingProfile) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let profile = profile.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO booking_profiles (email_normalized, has_booked, first_booked_at, updated_at, source)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(email_normalized) DO UPDATE SET
                    has_booked = excluded.has_booked,
                    first_booked_at = COALESCE(booking_profiles.first_booked_at, excluded.first_booked_at),
                    updated_at = excluded.updated_at,
                    source = excluded.source",
                params![
                    profile.email,
                    profile.has_booked,
                    profile.first_booked_at.map(|at| at.timestamp_millis()),
                    profile.updated_at.timestamp_millis(),
                    profile.source.as_str(),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn insert_event(&self, event: &BookingEvent) -> DomainResult<InsertOutcome> {
        let db = Arc::clone(&self.db);
        let event = event.clone();

        task::spawn_blocking(move || -> DomainResult<InsertOutcome> {
            let metadata = serde_json::to_string(&event.metadata)
                .map_err(|err| BookingError::from(InfraError::from(err)))?;
            let conn = db.get_connection()?;
            let result = conn.execute(
                "INSERT INTO booking_events
                    (email_normalized, event_type, source, stripe_session_id, google_event_id, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    event.email,
                    event.event_type.as_str(),
                    event.source.as_str(),
                    event.external_session_id,
                    event.external_event_id,
                    metadata,
                    event.observed_at.timestamp_millis(),
                ],
            );
            insert_outcome(result)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn load_watch_state(&self) -> DomainResult<Option<WatchState>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<WatchState>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT calendar_id, channel_id, channel_token, resource_id, expiration,
                        sync_token, last_sync_at, last_notification_at, updated_at
                 FROM google_calendar_watch_state WHERE id = ?1",
                params![WATCH_STATE_ID],
                map_watch_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn save_watch_state(&self, state: &WatchState) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let state = state.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO google_calendar_watch_state
                    (id, calendar_id, channel_id, channel_token, resource_id, expiration,
                     sync_token, last_sync_at, last_notification_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(id) DO UPDATE SET
                    calendar_id = excluded.calendar_id,
                    channel_id = excluded.channel_id,
                    channel_token = excluded.channel_token,
                    resource_id = excluded.resource_id,
                    expiration = excluded.expiration,
                    sync_token = excluded.sync_token,
                    last_sync_at = excluded.last_sync_at,
                    last_notification_at = excluded.last_notification_at,
                    updated_at = excluded.updated_at",
                params![
                    WATCH_STATE_ID,
                    state.calendar_id,
                    state.channel_id,
                    state.channel_token,
                    state.resource_id,
                    millis(state.expiration),
                    state.sync_token,
                    millis(state.last_sync_at),
                    millis(state.last_notification_at),
                    millis(state.updated_at),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn mark_watch_notification(&self, at: DateTime<Utc>) -> DomainResult<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "UPDATE google_calendar_watch_state SET last_notification_at = ?1 WHERE id = ?2",
                params![at.timestamp_millis(), WATCH_STATE_ID],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn health_check(&self) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || db.health_check()).await.map_err(map_join_error)?
    }
}

fn insert_outcome(result: rusqlite::Result<usize>) -> DomainResult<InsertOutcome> {
    match result {
        Ok(_) => Ok(InsertOutcome::Inserted),
        Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Duplicate),
        Err(err) => Err(map_sql_error(err)),
    }
}

fn millis(at: Option<DateTime<Utc>>) -> Option<i64> {
    at.map(|value| value.timestamp_millis())
}

fn from_millis(value: Option<i64>) -> Option<DateTime<Utc>> {
    value.and_then(DateTime::from_timestamp_millis)
}

fn conversion_error(index: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, message.into())
}

fn map_profile_row(row: &Row<'_>) -> rusqlite::Result<BookingProfile> {
    let updated_at: i64 = row.get(3)?;
    Ok(BookingProfile {
        email: row.get(0)?,
        has_booked: row.get(1)?,
        first_booked_at: from_millis(row.get(2)?),
        updated_at: DateTime::from_timestamp_millis(updated_at)
            .ok_or_else(|| conversion_error(3, format!("invalid timestamp {updated_at}")))?,
        source: BookingSource::custom(row.get::<_, String>(4)?),
    })
}

fn map_event_row(row: &Row<'_>) -> rusqlite::Result<BookingEvent> {
    let event_type: String = row.get(1)?;
    let metadata: String = row.get(5)?;
    let created_at: i64 = row.get(6)?;
    Ok(BookingEvent {
        email: row.get(0)?,
        event_type: BookingEventType::from_str(&event_type).map_err(|e| conversion_error(1, e))?,
        source: BookingSource::custom(row.get::<_, String>(2)?),
        external_session_id: row.get(3)?,
        external_event_id: row.get(4)?,
        metadata: serde_json::from_str(&metadata).map_err(|e| conversion_error(5, e.to_string()))?,
        observed_at: DateTime::from_timestamp_millis(created_at)
            .ok_or_else(|| conversion_error(6, format!("invalid timestamp {created_at}")))?,
    })
}

fn map_watch_row(row: &Row<'_>) -> rusqlite::Result<WatchState> {
    Ok(WatchState {
        calendar_id: row.get(0)?,
        channel_id: row.get(1)?,
        channel_token: row.get(2)?,
        resource_id: row.get(3)?,
        expiration: from_millis(row.get(4)?),
        sync_token: row.get(5)?,
        last_sync_at: from_millis(row.get(6)?),
        last_notification_at: from_millis(row.get(7)?),
        updated_at: from_millis(row.get(8)?),
    })
}

fn map_join_error(err: task::JoinError) -> BookingError {
    if err.is_cancelled() {
        BookingError::Internal("database task cancelled".into())
    } else {
        BookingError::Internal(format!("database task panicked: {err}"))
    }
}
