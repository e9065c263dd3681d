//! Download URL templates.
//!
//! A template carries the `{version}` placeholder, possibly more than once
//! (release URLs usually repeat the version in both the tag and the file
//! name). No other placeholder is recognised, and stray braces are
//! rejected so that a typo like `{verison}` fails at load time instead of
//! producing a 404 at fetch time.

use super::error::{ManifestError, Result};
use serde::Serialize;
use std::fmt;

/// The single substitutable placeholder.
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// URL schemes the fetcher knows how to retrieve.
const SUPPORTED_SCHEMES: &[&str] = &["https://", "http://", "file://"];

/// A validated download URL template.
///
/// # Examples
///
/// ```
/// use pour::manifest::url_template::UrlTemplate;
///
/// let template = UrlTemplate::try_from("https://example/pkg-v{version}.tar.gz")
///     .expect("valid template");
/// assert_eq!(template.resolve("0.1.0"), "https://example/pkg-v0.1.0.tar.gz");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    /// Return the raw template.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substitute `version` for every placeholder occurrence.
    #[must_use]
    pub fn resolve(&self, version: &str) -> String {
        self.0.replace(VERSION_PLACEHOLDER, version)
    }
}

impl TryFrom<&str> for UrlTemplate {
    type Error = ManifestError;

    fn try_from(value: &str) -> Result<Self> {
        validate_template(value)?;
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for UrlTemplate {
    type Error = ManifestError;

    fn try_from(value: String) -> Result<Self> {
        validate_template(&value)?;
        Ok(Self(value))
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_template(value: &str) -> Result<()> {
    let reject = |reason: String| -> Result<()> {
        Err(ManifestError::InvalidUrlTemplate {
            value: value.to_owned(),
            reason,
        })
    };

    if !SUPPORTED_SCHEMES.iter().any(|s| value.starts_with(s)) {
        return reject(format!(
            "expected a URL starting with one of: {}",
            SUPPORTED_SCHEMES.join(", ")
        ));
    }
    if !value.contains(VERSION_PLACEHOLDER) {
        return reject(format!("missing {VERSION_PLACEHOLDER} placeholder"));
    }

    let remainder = value.replace(VERSION_PLACEHOLDER, "");
    if remainder.contains('{') || remainder.contains('}') {
        return reject(format!(
            "only the {VERSION_PLACEHOLDER} placeholder is supported"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn resolves_repeated_placeholder() {
        let template = UrlTemplate::try_from(
            "https://github.com/brdv/stck/releases/download/v{version}/stck-v{version}-aarch64-apple-darwin.tar.gz",
        )
        .expect("valid template");
        assert_eq!(
            template.resolve("0.1.0"),
            "https://github.com/brdv/stck/releases/download/v0.1.0/stck-v0.1.0-aarch64-apple-darwin.tar.gz"
        );
    }

    #[rstest]
    #[case::no_placeholder("https://example/pkg.tar.gz")]
    #[case::unknown_placeholder("https://example/{name}-{version}.tar.gz")]
    #[case::misspelt("https://example/pkg-{verison}.tar.gz")]
    #[case::dangling_brace("https://example/pkg-{version.tar.gz")]
    #[case::bad_scheme("ftp://example/pkg-{version}.tar.gz")]
    fn rejects_malformed_templates(#[case] value: &str) {
        assert!(matches!(
            UrlTemplate::try_from(value),
            Err(ManifestError::InvalidUrlTemplate { .. })
        ));
    }

    #[test]
    fn accepts_file_scheme() {
        assert!(UrlTemplate::try_from("file:///srv/mirror/pkg-{version}.tgz").is_ok());
    }
}
