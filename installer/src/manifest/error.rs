//! Error types for formula manifest loading and validation.
//!
//! Each variant identifies the offending field and the constraint it
//! violated. All of them are fatal: a manifest that fails validation never
//! reaches the install pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Errors arising from an invalid or unreadable manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read manifest {path}: {source}")]
    Read {
        /// Path of the manifest file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not well-formed TOML or has missing/unknown keys.
    #[error("manifest parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The package name is empty or contains disallowed characters.
    #[error("invalid package name \"{value}\": {reason}")]
    InvalidName {
        /// The rejected name.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// The version is not a semantic version.
    #[error("invalid version \"{value}\": {reason}")]
    InvalidVersion {
        /// The rejected version string.
        value: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// The homepage is not an http(s) URI.
    #[error("invalid homepage \"{value}\": expected an http:// or https:// URI")]
    InvalidHomepage {
        /// The rejected homepage.
        value: String,
    },

    /// The download URL template is malformed.
    #[error("invalid url template \"{value}\": {reason}")]
    InvalidUrlTemplate {
        /// The rejected template.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// The platform constraint names an architecture or OS outside the
    /// supported set.
    #[error("unsupported platform {field} \"{value}\"; expected one of: {expected}")]
    UnsupportedPlatform {
        /// Which constraint key was rejected (`arch` or `os`).
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Comma-separated list of accepted values.
        expected: String,
    },

    /// A platform table was declared without any constraint in it.
    #[error("platform constraint must set at least one of `arch` or `os`")]
    EmptyPlatform,

    /// The checksum is not a 64-character hex digest.
    #[error("invalid SHA-256 digest: {reason}")]
    InvalidSha256 {
        /// Description of the validation failure.
        reason: String,
    },

    /// The checksum is an unset placeholder such as all zeros.
    #[error("checksum \"{value}\" is a placeholder; set the real SHA-256 of the release archive")]
    PlaceholderChecksum {
        /// The placeholder value found in the manifest.
        value: String,
    },

    /// The install action list is empty or an action is malformed.
    #[error("invalid install action #{index}: {reason}")]
    InvalidInstallAction {
        /// Zero-based position of the action in the manifest.
        index: usize,
        /// Description of the validation failure.
        reason: String,
    },

    /// The manifest installs nothing under a primary-binary role.
    #[error("manifest declares no primary-binary install action")]
    NoPrimaryBinary,

    /// The smoke test declaration is malformed.
    #[error("invalid test declaration: {reason}")]
    InvalidTest {
        /// Description of the validation failure.
        reason: String,
    },
}

/// Result type alias using [`ManifestError`].
pub type Result<T> = std::result::Result<T, ManifestError>;
