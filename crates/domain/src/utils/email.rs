//! Email normalisation and validation
//!
//! Every email that reaches the data store goes through [`normalize_email`]
//! first; the normalised form is the profile key.

use once_cell::sync::Lazy;
use regex::Regex;

#[allow(clippy::expect_used)]
static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// Trim and lowercase an optional raw email. Missing input becomes `""`.
pub fn normalize_email(value: Option<&str>) -> String {
    value.unwrap_or_default().trim().to_lowercase()
}

/// Syntactic check only: `local@domain.tld` without whitespace.
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

/// Normalise and validate in one step, returning `None` for empty or
/// malformed input.
pub fn normalized_valid_email(value: Option<&str>) -> Option<String> {
    let email = normalize_email(value);
    (!email.is_empty() && is_valid_email(&email)).then_some(email)
}
