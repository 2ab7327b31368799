//! # bookingsync Domain
//!
//! Business domain types and models for booking reconciliation.
//!
//! This crate contains:
//! - Booking profiles, audit events, watch state and calendar event models
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants and email rules
//!
//! ## Architecture
//! - No dependencies on other bookingsync crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::email::{is_valid_email, normalize_email, normalized_valid_email};
pub use utils::secrets::secrets_match;
