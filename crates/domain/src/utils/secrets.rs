//! Shared-secret comparison

use subtle::ConstantTimeEq;

/// Compare a presented secret against the expected one in constant time.
/// Empty values never match.
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    if provided.is_empty() || expected.is_empty() {
        return false;
    }
    bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_secrets_match() {
        assert!(secrets_match("admin-secret", "admin-secret"));
    }

    #[test]
    fn differing_or_truncated_secrets_do_not_match() {
        assert!(!secrets_match("admin-secreT", "admin-secret"));
        assert!(!secrets_match("admin", "admin-secret"));
        assert!(!secrets_match("admin-secret-extra", "admin-secret"));
    }

    #[test]
    fn empty_secrets_never_match() {
        assert!(!secrets_match("", ""));
        assert!(!secrets_match("", "admin-secret"));
    }
}
