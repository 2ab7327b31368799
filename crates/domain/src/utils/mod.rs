//! Domain utilities

pub mod email;
pub mod secrets;
