//! Google Calendar integration
//!
//! Service-account authentication plus the event listing and push-channel
//! endpoints used by booking reconciliation.

pub mod client;
pub mod credentials;
mod types;

pub use client::GoogleCalendarClient;
pub use credentials::{
    AccessTokenProvider, AssertionClaims, AssertionSigner, Rs256Signer, ServiceAccountKey,
    ServiceAccountTokenProvider, UnavailableCredentials,
};
