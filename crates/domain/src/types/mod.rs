//! Domain types and models

pub mod booking_event;
pub mod calendar;
pub mod profile;
pub mod source;
pub mod sync;
pub mod token;
pub mod watch;

pub use booking_event::{BookingEvent, BookingEventType};
pub use calendar::{CalendarEvent, EventPage, EventTime};
pub use profile::{resolve_first_booked_at, BookingProfile};
pub use source::BookingSource;
pub use sync::{SyncMode, SyncOutcome};
pub use token::BookingTokenClaims;
pub use watch::{ChannelCredentials, WatchState};
