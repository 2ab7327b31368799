//! Macro for implementing Display and FromStr for wire-tagged enums
//!
//! Booking event types, sync modes and similar enums are persisted and sent
//! over the wire as fixed strings. This macro keeps the string mapping in one
//! place for both directions.
//!
//! # Example
//!
//! ```rust
//! use bookingsync_domain::impl_wire_enum_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Channel {
//!     Website,
//!     Webhook,
//! }
//!
//! impl_wire_enum_conversions!(Channel {
//!     Website => "website",
//!     Webhook => "webhook",
//! });
//! ```

/// Implements Display and FromStr traits for wire-tagged enums
///
/// This macro generates:
/// - Display trait: writes the mapped wire string
/// - FromStr trait: parses case-insensitive strings back to enum variants
///
/// Wire strings must be lowercase for parsing to round-trip.
#[macro_export]
macro_rules! impl_wire_enum_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Stable wire representation.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestKind {
        Intake,
        Confirmed,
    }

    impl_wire_enum_conversions!(TestKind {
        Intake => "booking.intake",
        Confirmed => "booking.confirmed",
    });

    #[test]
    fn display_uses_wire_string() {
        assert_eq!(TestKind::Intake.to_string(), "booking.intake");
        assert_eq!(TestKind::Confirmed.as_str(), "booking.confirmed");
    }

    #[test]
    fn fromstr_is_case_insensitive() {
        assert_eq!(TestKind::from_str("BOOKING.Intake").unwrap(), TestKind::Intake);
        assert_eq!(TestKind::from_str("booking.confirmed").unwrap(), TestKind::Confirmed);
    }

    #[test]
    fn fromstr_rejects_unknown() {
        let result = TestKind::from_str("booking.cancelled");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Invalid TestKind: booking.cancelled"));
    }
}
