//! Calendar sync outcome types

use serde::{Deserialize, Serialize};

use crate::impl_wire_enum_conversions;

/// How a sync run read the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    Full,
    Incremental,
}

impl_wire_enum_conversions!(SyncMode {
    Full => "full",
    Incremental => "incremental",
});

/// Result of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    /// Cursor to persist for the next incremental run.
    pub next_sync_token: String,
    pub mode: SyncMode,
    /// The stored cursor was rejected and the run fell back to full mode.
    pub expired_sync_token: bool,
    pub events_seen: usize,
    pub events_matched: usize,
    pub profiles_updated: usize,
}
