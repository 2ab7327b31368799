//! Infrastructure error handling

pub mod conversions;

pub use conversions::{is_unique_violation, InfraError};
