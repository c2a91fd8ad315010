//! Shared-secret validation.

use crate::config::RevalidationConfig;
use sha2::{Digest, Sha256};
use std::fmt;

type SecretDigest = [u8; 32];

/// Checks caller-supplied secrets against the configured ones.
///
/// Both sides are reduced to SHA-256 digests and compared without early exit,
/// so timing does not depend on where the first differing byte sits or on
/// which configured secret matched.
#[derive(Clone)]
pub struct SecretValidator {
    expected: Vec<SecretDigest>,
}

impl SecretValidator {
    /// Build a validator. Empty secrets are dropped and never match.
    pub fn new<I, S>(secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let expected = secrets
            .into_iter()
            .filter(|s| !s.as_ref().is_empty())
            .map(|s| digest(s.as_ref()))
            .collect();
        Self { expected }
    }

    /// Build from the revalidation config (primary secret plus previous ones).
    pub fn from_config(config: &RevalidationConfig) -> Self {
        Self::new(std::iter::once(&config.secret).chain(config.previous_secrets.iter()))
    }

    /// Whether at least one non-empty secret is configured.
    pub fn is_configured(&self) -> bool {
        !self.expected.is_empty()
    }

    /// Returns true iff `supplied` equals one of the configured secrets.
    pub fn validate(&self, supplied: &str) -> bool {
        if supplied.is_empty() {
            return false;
        }

        let supplied = digest(supplied);
        let mut matched = false;
        for expected in &self.expected {
            matched |= constant_time_eq(&supplied, expected);
        }
        matched
    }
}

impl fmt::Debug for SecretValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValidator")
            .field("configured", &self.expected.len())
            .finish()
    }
}

fn digest(value: &str) -> SecretDigest {
    Sha256::digest(value.as_bytes()).into()
}

fn constant_time_eq(a: &SecretDigest, b: &SecretDigest) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_configured_secret() {
        let validator = SecretValidator::new(["correct"]);
        assert!(validator.validate("correct"));
    }

    #[test]
    fn rejects_wrong_missing_and_empty() {
        let validator = SecretValidator::new(["correct"]);
        assert!(!validator.validate("wrong"));
        assert!(!validator.validate(""));
        assert!(!validator.validate("correct "));
    }

    #[test]
    fn empty_configuration_never_matches() {
        let validator = SecretValidator::new([""]);
        assert!(!validator.is_configured());
        assert!(!validator.validate(""));
        assert!(!validator.validate("anything"));
    }

    #[test]
    fn previous_secrets_still_validate() {
        let config = RevalidationConfig {
            secret: "new-secret".to_string(),
            previous_secrets: vec!["old-secret".to_string()],
        };
        let validator = SecretValidator::from_config(&config);
        assert!(validator.validate("new-secret"));
        assert!(validator.validate("old-secret"));
        assert!(!validator.validate("other"));
    }

    #[test]
    fn debug_does_not_print_digests() {
        let validator = SecretValidator::new(["correct"]);
        assert_eq!(
            format!("{validator:?}"),
            "SecretValidator { configured: 1 }"
        );
    }
}
