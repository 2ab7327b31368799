//! Booking store implementations

pub mod booking_repository;
pub mod manager;
pub mod postgrest_store;

pub use booking_repository::SqliteBookingStore;
pub use manager::{DbManager, SqliteConnection};
pub use postgrest_store::PostgrestBookingStore;
