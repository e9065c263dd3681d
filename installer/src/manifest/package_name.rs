//! Package name newtype.
//!
//! Formula names double as file names (receipts, lock files), so they are
//! restricted to ASCII alphanumerics plus `-`, `_` and `.`, and may not start
//! with a dot.

use super::error::{ManifestError, Result};
use serde::Serialize;
use std::fmt;

/// A validated package identifier such as `stck`.
///
/// # Examples
///
/// ```
/// use pour::manifest::package_name::PackageName;
///
/// let name = PackageName::try_from("stck").expect("valid name");
/// assert_eq!(name.as_str(), "stck");
/// assert!(PackageName::try_from("../stck").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    /// Return the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for PackageName {
    type Error = ManifestError;

    fn try_from(value: &str) -> Result<Self> {
        validate_name(value)?;
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for PackageName {
    type Error = ManifestError;

    fn try_from(value: String) -> Result<Self> {
        validate_name(&value)?;
        Ok(Self(value))
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_name(value: &str) -> Result<()> {
    let reject = |reason: &str| -> Result<()> {
        Err(ManifestError::InvalidName {
            value: value.to_owned(),
            reason: reason.to_owned(),
        })
    };

    if value.is_empty() {
        return reject("name must not be empty");
    }
    if value.starts_with('.') {
        return reject("name must not start with '.'");
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return reject(&format!("disallowed character '{bad}'"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::simple("stck")]
    #[case::hyphenated("git-stck")]
    #[case::dotted("foo.bar_2")]
    fn accepts_plain_names(#[case] value: &str) {
        assert!(PackageName::try_from(value).is_ok());
    }

    #[rstest]
    #[case::empty("")]
    #[case::hidden(".stck")]
    #[case::slash("a/b")]
    #[case::space("a b")]
    fn rejects_bad_names(#[case] value: &str) {
        assert!(matches!(
            PackageName::try_from(value),
            Err(ManifestError::InvalidName { .. })
        ));
    }
}
