//! Request authentication primitives

pub mod booking_token;
pub mod stripe;

pub use booking_token::BookingTokenCodec;
pub use stripe::{sign_payload, StripeEvent, StripeWebhookVerifier};
