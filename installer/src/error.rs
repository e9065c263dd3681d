//! Error types for the `pour` installer.
//!
//! Each pipeline stage owns a semantic error enum; [`InstallError`] wraps
//! them unchanged so callers can still match on the originating failure.
//! [`ErrorCategory`] groups them for exit codes and recovery hints.

use std::fmt;

use thiserror::Error;

use crate::artefact::download::FetchError;
use crate::artefact::extraction::ExtractionError;
use crate::artefact::verification::ChecksumError;
use crate::lock::LockError;
use crate::manifest::ManifestError;
use crate::placement::PlacementError;
use crate::smoke::SmokeTestError;

/// Errors that can end an install run.
#[derive(Debug, Error)]
pub enum InstallError {
    /// The manifest could not be read or failed validation.
    #[error("invalid manifest: {0}")]
    Manifest(#[from] ManifestError),

    /// The artefact could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The artefact failed its integrity check.
    #[error(transparent)]
    Checksum(#[from] ChecksumError),

    /// The artefact could not be unpacked.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Files could not be placed under the prefix.
    #[error(transparent)]
    Placement(#[from] PlacementError),

    /// The installed binary failed its smoke test.
    #[error("installed, but the smoke test failed: {0}")]
    SmokeTest(#[from] SmokeTestError),

    /// The per-package install lock could not be taken.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// The run was interrupted.
    #[error("install cancelled")]
    Cancelled,
}

/// Coarse grouping of [`InstallError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Unreadable or invalid manifest.
    Manifest,
    /// The host is excluded by the platform constraint.
    Platform,
    /// Connection failures, timeouts and HTTP error statuses.
    Network,
    /// Declared and computed digests differ.
    Integrity,
    /// Unsupported, corrupt, empty or escaping archives.
    Archive,
    /// Local filesystem failures, missing archive entries and locking.
    Filesystem,
    /// The smoke test did not pass.
    Validation,
    /// The run was interrupted.
    Cancelled,
}

impl ErrorCategory {
    /// Process exit code for this category.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Manifest => 2,
            Self::Platform => 3,
            Self::Network => 4,
            Self::Integrity => 5,
            Self::Archive => 6,
            Self::Filesystem => 7,
            Self::Validation => 8,
            Self::Cancelled => 130,
        }
    }

    /// A one-line suggestion for the user, if there is a useful one.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::Platform => Some("this formula does not ship a build for this host"),
            Self::Network => Some("check connectivity or raise --timeout / POUR_TIMEOUT_SECS"),
            Self::Integrity => {
                Some("the download does not match the formula; nothing was installed")
            }
            Self::Filesystem => Some("check that --prefix / POUR_PREFIX is writable"),
            Self::Manifest | Self::Archive | Self::Validation | Self::Cancelled => None,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Manifest => "manifest",
            Self::Platform => "platform",
            Self::Network => "network",
            Self::Integrity => "integrity",
            Self::Archive => "archive",
            Self::Filesystem => "filesystem",
            Self::Validation => "validation",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

impl InstallError {
    /// Classify this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Manifest(_) => ErrorCategory::Manifest,
            Self::Fetch(FetchError::PlatformMismatch { .. }) => ErrorCategory::Platform,
            Self::Fetch(FetchError::Io { .. }) => ErrorCategory::Filesystem,
            Self::Fetch(FetchError::Cancelled) | Self::Cancelled => ErrorCategory::Cancelled,
            Self::Fetch(_) => ErrorCategory::Network,
            Self::Checksum(ChecksumError::Mismatch { .. }) => ErrorCategory::Integrity,
            Self::Checksum(ChecksumError::Io { .. }) => ErrorCategory::Filesystem,
            Self::Extraction(ExtractionError::Io(_)) => ErrorCategory::Filesystem,
            Self::Extraction(_) => ErrorCategory::Archive,
            Self::Lock(LockError::Cancelled { .. }) => ErrorCategory::Cancelled,
            Self::Placement(_) | Self::Lock(LockError::Io { .. }) => ErrorCategory::Filesystem,
            Self::SmokeTest(_) => ErrorCategory::Validation,
        }
    }

    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }
}

/// Result type alias using [`InstallError`].
pub type Result<T> = std::result::Result<T, InstallError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::sha256_digest::Sha256Digest;
    use rstest::rstest;
    use std::io;
    use std::path::PathBuf;

    fn digest(byte: u8) -> Sha256Digest {
        Sha256Digest::from_bytes(&[byte; 32])
    }

    #[rstest]
    #[case::manifest(InstallError::Manifest(ManifestError::NoPrimaryBinary), 2)]
    #[case::platform(
        InstallError::Fetch(FetchError::PlatformMismatch {
            required: "arm64-macos".to_owned(),
            host: "x86_64-linux".to_owned(),
        }),
        3
    )]
    #[case::http(
        InstallError::Fetch(FetchError::HttpStatus { url: "u".to_owned(), status: 404 }),
        4
    )]
    #[case::redirects(
        InstallError::Fetch(FetchError::RedirectLimit { url: "u".to_owned(), limit: 5 }),
        4
    )]
    #[case::mismatch(
        InstallError::Checksum(ChecksumError::Mismatch {
            path: PathBuf::from("a"),
            expected: digest(1),
            actual: digest(2),
        }),
        5
    )]
    #[case::traversal(
        InstallError::Extraction(ExtractionError::PathTraversal { path: "../x".to_owned() }),
        6
    )]
    #[case::empty(InstallError::Extraction(ExtractionError::EmptyArchive), 6)]
    #[case::missing_entry(
        InstallError::Placement(PlacementError::MissingEntry {
            action_index: 0,
            entry: PathBuf::from("bin/tool"),
        }),
        7
    )]
    #[case::download_write(
        InstallError::Fetch(FetchError::Io {
            path: PathBuf::from("/tmp/x"),
            source: io::Error::other("disk full"),
        }),
        7
    )]
    #[case::smoke(
        InstallError::SmokeTest(SmokeTestError::MissingOutput {
            command: "tool --help".to_owned(),
            expected: "tool".to_owned(),
            excerpt: String::new(),
        }),
        8
    )]
    #[case::cancelled_fetch(InstallError::Fetch(FetchError::Cancelled), 130)]
    #[case::cancelled(InstallError::Cancelled, 130)]
    #[case::cancelled_lock_wait(
        InstallError::Lock(LockError::Cancelled { path: PathBuf::from("/p/tool.lock") }),
        130
    )]
    #[case::lock_io(
        InstallError::Lock(LockError::Io {
            path: PathBuf::from("/p/tool.lock"),
            source: io::Error::other("read-only"),
        }),
        7
    )]
    fn exit_codes_follow_category(#[case] err: InstallError, #[case] code: i32) {
        assert_eq!(err.exit_code(), code);
    }

    #[test]
    fn smoke_test_message_says_package_is_installed() {
        let err = InstallError::SmokeTest(SmokeTestError::TimedOut {
            command: "tool --help".to_owned(),
            timeout: std::time::Duration::from_secs(3),
        });
        let msg = err.to_string();
        assert!(msg.starts_with("installed, but the smoke test failed"));
        assert!(msg.contains("3s"));
    }

    #[test]
    fn wrapped_errors_keep_their_message() {
        let err = InstallError::from(FetchError::HttpStatus {
            url: "https://h.test/a.tar.gz".to_owned(),
            status: 500,
        });
        assert_eq!(
            err.to_string(),
            "server returned HTTP 500 for https://h.test/a.tar.gz"
        );
    }

    #[test]
    fn integrity_hint_says_nothing_was_installed() {
        let hint = ErrorCategory::Integrity.hint().expect("integrity hint");
        assert!(hint.contains("nothing was installed"));
    }
}
