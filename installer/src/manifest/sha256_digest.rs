//! SHA-256 digest newtype for archive verification.
//!
//! Accepts a 64-character hexadecimal string in either case and stores it
//! lowercase, so comparisons against computed digests are case-insensitive.
//! Values made of a single repeated character (the all-zero string that
//! formula templates ship with, for instance) are treated as unset.

use super::error::{ManifestError, Result};
use serde::Serialize;
use std::fmt;

/// Expected length of a hex-encoded SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// A validated, lowercase hex-encoded SHA-256 digest.
///
/// # Examples
///
/// ```
/// use pour::manifest::sha256_digest::Sha256Digest;
///
/// let hex = "AB".repeat(32);
/// let digest = Sha256Digest::try_from(hex.as_str()).expect("valid digest");
/// assert_eq!(digest.as_str(), "ab".repeat(32));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Return the digest as a lowercase hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build a digest from raw hash output bytes.
    ///
    /// Used by the verifier; a placeholder check is pointless for computed
    /// values so none is applied.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let hex = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Self(hex)
    }
}

impl TryFrom<&str> for Sha256Digest {
    type Error = ManifestError;

    fn try_from(value: &str) -> Result<Self> {
        validate_sha256(value)?;
        Ok(Self(value.to_ascii_lowercase()))
    }
}

impl TryFrom<String> for Sha256Digest {
    type Error = ManifestError;

    fn try_from(value: String) -> Result<Self> {
        Self::try_from(value.as_str())
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate that `value` is a usable hex-encoded SHA-256 digest.
fn validate_sha256(value: &str) -> Result<()> {
    if value.len() != DIGEST_HEX_LEN {
        return Err(ManifestError::InvalidSha256 {
            reason: format!(
                "expected {DIGEST_HEX_LEN} hex characters, got {}",
                value.len()
            ),
        });
    }
    if let Some(bad) = value.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ManifestError::InvalidSha256 {
            reason: format!("non-hex character '{bad}'"),
        });
    }
    if is_placeholder(value) {
        return Err(ManifestError::PlaceholderChecksum {
            value: value.to_owned(),
        });
    }
    Ok(())
}

/// A digest consisting of one repeated character is never a real hash.
fn is_placeholder(value: &str) -> bool {
    let mut chars = value.chars().map(|c| c.to_ascii_lowercase());
    match chars.next() {
        Some(first) => chars.all(|c| c == first),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const VALID: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    #[test]
    fn accepts_valid_sixty_four_char_hex() {
        let digest = Sha256Digest::try_from(VALID).expect("valid digest");
        assert_eq!(digest.as_str(), VALID);
    }

    #[test]
    fn normalises_uppercase_to_lowercase() {
        let upper = VALID.to_ascii_uppercase();
        let digest = Sha256Digest::try_from(upper.as_str()).expect("valid digest");
        assert_eq!(digest.as_str(), VALID);
    }

    #[rstest]
    #[case::too_short(6)]
    #[case::too_long(66)]
    #[case::empty(0)]
    fn rejects_wrong_length(#[case] len: usize) {
        let value: String = VALID.chars().cycle().take(len).collect();
        let result = Sha256Digest::try_from(value.as_str());
        assert!(matches!(result, Err(ManifestError::InvalidSha256 { .. })));
    }

    #[test]
    fn rejects_non_hex_characters() {
        let mut bad = VALID[..63].to_owned();
        bad.push('g');
        let result = Sha256Digest::try_from(bad.as_str());
        assert!(matches!(result, Err(ManifestError::InvalidSha256 { .. })));
    }

    #[rstest]
    #[case::all_zero("0")]
    #[case::all_a("a")]
    #[case::all_upper_f("F")]
    fn rejects_placeholder_digests(#[case] ch: &str) {
        let value = ch.repeat(64);
        let result = Sha256Digest::try_from(value.as_str());
        assert!(
            matches!(result, Err(ManifestError::PlaceholderChecksum { .. })),
            "expected placeholder rejection for {value}"
        );
    }

    #[test]
    fn from_bytes_encodes_lowercase_hex() {
        let digest = Sha256Digest::from_bytes(&[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(digest.as_str(), "deadbeef");
    }

    #[test]
    fn display_shows_full_digest() {
        let digest = Sha256Digest::try_from(VALID).expect("known good");
        assert_eq!(format!("{digest}"), VALID);
    }
}
