//! # bookingsync Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - Booking stores (SQLite via r2d2, hosted Postgres via PostgREST)
//! - Google Calendar client with a cached service-account credential
//! - Booking token codec and Stripe webhook verification
//! - Configuration loading and the watch renewal scheduler
//!
//! ## Architecture
//! - Implements traits defined in `bookingsync-core`
//! - Contains all "impure" code (I/O, clocks, secrets)

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod scheduling;
pub mod security;

// Re-export commonly used items
pub use database::{DbManager, PostgrestBookingStore, SqliteBookingStore};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use integrations::google::{
    GoogleCalendarClient, ServiceAccountKey, ServiceAccountTokenProvider, UnavailableCredentials,
};
pub use scheduling::{WatchRenewalConfig, WatchRenewalScheduler};
pub use security::{BookingTokenCodec, StripeEvent, StripeWebhookVerifier};
