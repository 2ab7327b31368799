//! Booking profiles, audit events and the use cases behind the HTTP surface

pub mod payments;
pub mod ports;
pub mod service;
