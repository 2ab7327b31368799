//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Watch state
pub const WATCH_STATE_ID: i64 = 1;
/// Provider maximum lifetime of a push channel (7 days).
pub const MAX_WATCH_TTL_SECONDS: u64 = 604_800;
pub const DEFAULT_WATCH_RENEWAL_WINDOW_SECONDS: u64 = 86_400;
pub const DEFAULT_WATCH_RENEWAL_CRON: &str = "0 0 * * * *";

// Calendar sync
pub const EVENTS_PAGE_SIZE: u32 = 250;
pub const DEFAULT_APPOINTMENT_SET_KEY: &str = "default_cita";
pub const APPOINTMENT_SET_PROPERTY_KEYS: [&str; 2] = ["goo_createdBySet", "goo.createdBySet"];
pub const CANCELLED_EVENT_STATUS: &str = "cancelled";
pub const RESOURCE_STATE_NOT_EXISTS: &str = "not_exists";
pub const SYNC_TOKEN_UNUSABLE_MARKER: &str = "sync token cannot be used";

// Service credentials
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
pub const DEFAULT_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
pub const ASSERTION_LIFETIME_SECONDS: i64 = 3600;
pub const CREDENTIAL_REFRESH_MARGIN_SECONDS: i64 = 60;

// Booking tokens
/// 364 days.
pub const BOOKING_TOKEN_TTL_SECONDS: i64 = 31_449_600;
pub const BOOKING_TOKEN_COOKIE: &str = "bookingToken";
pub const BOOKING_TOKEN_HEADER: &str = "x-booking-token";

// Payments
pub const STRIPE_SIGNATURE_TOLERANCE_SECONDS: i64 = 300;
pub const UNKNOWN_EMAIL: &str = "unknown";

// Request field limits
pub const MAX_SOURCE_LENGTH: usize = 120;
pub const MAX_SESSION_ID_LENGTH: usize = 250;

// CORS
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 5] = [
    "https://kevinarmstrong.io",
    "https://www.kevinarmstrong.io",
    "https://spikeycoder.github.io",
    "http://localhost:3000",
    "http://localhost:5173",
];
pub const DEFAULT_ORIGIN: &str = "https://kevinarmstrong.io";
