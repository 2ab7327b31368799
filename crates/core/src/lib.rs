//! # Bookingsync Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for the profile store and calendar provider
//! - The booking reconciliation engine
//! - Watch channel lifecycle management
//! - Booking use cases consumed by the HTTP layer
//!
//! ## Architecture Principles
//! - Only depends on `bookingsync-domain`
//! - No database, HTTP, or signing code
//! - All external dependencies via traits
//! - Time comes from an injected [`Clock`]

pub mod booking;
pub mod calendar;
pub mod clock;

pub use booking::ports::{BookingStore, InsertOutcome};
pub use booking::service::{
    BookingService, BookingStatus, CalendarNotification, ConfirmRequest, IntakeRequest,
    NotificationOutcome, SetupOutcome, StatusRequest,
};
pub use booking::payments::{CheckoutCompleted, PaymentSucceeded};
pub use calendar::ports::{
    CalendarGateway, EventListQuery, ListEventsOutcome, StopOutcome, WatchRegistration,
    WatchRequest,
};
pub use calendar::reconciler::{BookingReconciler, ReconcileSettings};
pub use calendar::watch::{CreatedChannel, WatchChannelManager, WatchSettings};
pub use clock::{Clock, SystemClock};
