//! Artefact retrieval for formula installs.
//!
//! Provides a trait-based abstraction for fetching the archive a manifest
//! points at, enabling dependency injection for testing. The platform
//! constraint is checked before any fetch is attempted.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;

use crate::cancel::CancelFlag;
use crate::manifest::PackageManifest;
use crate::manifest::platform::HostPlatform;

/// Redirect hops followed before a request is abandoned.
pub const MAX_REDIRECTS: u32 = 5;

/// Default network timeout for a whole artefact download.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

const COPY_CHUNK: usize = 64 * 1024;
const FALLBACK_FILE_NAME: &str = "artefact";

/// Trait for fetching artefact bytes into a local file.
///
/// Abstractions allow tests to mock HTTP behaviour without network access.
///
/// # Examples
///
/// ```
/// use pour::artefact::download::{DEFAULT_FETCH_TIMEOUT, HttpFetcher};
///
/// let fetcher = HttpFetcher::new(DEFAULT_FETCH_TIMEOUT);
/// // Use fetcher.fetch(url, dest, &cancel) in production
/// # let _ = fetcher;
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArtefactFetcher {
    /// Write the body found at `url` to `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Network`] or [`FetchError::HttpStatus`] when the
    /// remote cannot be read, [`FetchError::Io`] when `dest` cannot be
    /// written, and [`FetchError::Cancelled`] if `cancel` is set mid-copy.
    fn fetch(&self, url: &str, dest: &Path, cancel: &CancelFlag) -> Result<(), FetchError>;
}

/// Errors arising from artefact retrieval.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The manifest's platform constraint excludes this host.
    #[error("package requires {required} but this host is {host}")]
    PlatformMismatch {
        /// The constraint from the manifest.
        required: String,
        /// The detected host.
        host: String,
    },

    /// The request could not be completed (DNS, connect, TLS, timeout).
    #[error("download failed for {url}: {reason}")]
    Network {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The server answered with a non-success status.
    #[error("server returned HTTP {status} for {url}")]
    HttpStatus {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The redirect chain exceeded [`MAX_REDIRECTS`].
    #[error("redirect limit of {limit} exceeded for {url}")]
    RedirectLimit {
        /// The URL that was requested.
        url: String,
        /// The configured hop limit.
        limit: u32,
    },

    /// Local I/O failure while storing the download.
    #[error("I/O error writing download to {path}: {source}")]
    Io {
        /// The file or directory being written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The download was interrupted by a cancellation request.
    #[error("download cancelled")]
    Cancelled,
}

/// A downloaded archive living in its own temporary directory.
///
/// Dropping the value deletes the directory and the archive with it.
#[derive(Debug)]
pub struct DownloadedArtefact {
    _dir: TempDir,
    path: PathBuf,
    source_url: String,
}

impl DownloadedArtefact {
    /// Path of the downloaded archive.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The resolved URL the archive came from.
    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// File name of the archive, used for format detection.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(FALLBACK_FILE_NAME)
    }
}

/// Fetch the archive described by `manifest` into a fresh temporary directory.
///
/// The platform constraint is checked first; on a mismatch `fetcher` is never
/// called. Temporary directories are created under `temp_root` when given,
/// otherwise under the system temp directory.
///
/// # Errors
///
/// Returns [`FetchError::PlatformMismatch`] when the host is excluded, and
/// propagates fetcher and temp-directory failures unchanged.
pub fn fetch_artefact(
    manifest: &PackageManifest,
    host: &HostPlatform,
    fetcher: &dyn ArtefactFetcher,
    cancel: &CancelFlag,
    temp_root: Option<&Path>,
) -> Result<DownloadedArtefact, FetchError> {
    check_platform(manifest, host)?;

    let url = manifest.resolved_url();
    let dir = make_temp_dir("pour-download-", temp_root)?;
    let path = dir.path().join(file_name_from_url(&url));

    log::debug!("fetching {url} into {}", path.display());
    fetcher.fetch(&url, &path, cancel)?;

    Ok(DownloadedArtefact {
        _dir: dir,
        path,
        source_url: url,
    })
}

/// Fail with [`FetchError::PlatformMismatch`] when `host` does not satisfy
/// the manifest's platform constraint.
///
/// # Errors
///
/// Returns [`FetchError::PlatformMismatch`] on a mismatch.
pub fn check_platform(manifest: &PackageManifest, host: &HostPlatform) -> Result<(), FetchError> {
    match manifest.platform() {
        Some(constraint) if !constraint.is_satisfied_by(host) => {
            Err(FetchError::PlatformMismatch {
                required: constraint.to_string(),
                host: host.to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Create a prefixed temporary directory, optionally under `root`.
pub(crate) fn make_temp_dir(prefix: &str, root: Option<&Path>) -> Result<TempDir, FetchError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(prefix);
    let result = match root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    };
    result.map_err(|source| FetchError::Io {
        path: root.map_or_else(std::env::temp_dir, Path::to_path_buf),
        source,
    })
}

/// Derive a local file name from the last path segment of `url`.
fn file_name_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .unwrap_or(FALLBACK_FILE_NAME)
        .to_owned()
}

/// HTTP-based fetcher using `ureq`, with `file://` served locally.
///
/// Proxy settings follow the `HTTP_PROXY`/`HTTPS_PROXY`/`ALL_PROXY`/
/// `NO_PROXY` environment conventions picked up by the agent's defaults.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    /// Build a fetcher whose requests give up after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .max_redirects(MAX_REDIRECTS)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

impl ArtefactFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path, cancel: &CancelFlag) -> Result<(), FetchError> {
        if let Some(local) = url.strip_prefix("file://") {
            let mut reader = fs::File::open(local).map_err(|e| FetchError::Network {
                url: url.to_owned(),
                reason: e.to_string(),
            })?;
            return copy_to_file(url, &mut reader, dest, cancel);
        }

        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let mut reader = response.into_body().into_reader();
        copy_to_file(url, &mut reader, dest, cancel)
    }
}

/// Stream `reader` into a new file at `dest`, checking `cancel` per chunk.
///
/// Read failures are network failures; write failures are local I/O.
fn copy_to_file(
    url: &str,
    reader: &mut dyn Read,
    dest: &Path,
    cancel: &CancelFlag,
) -> Result<(), FetchError> {
    let io_error = |source| FetchError::Io {
        path: dest.to_path_buf(),
        source,
    };
    let mut file = fs::File::create(dest).map_err(io_error)?;
    let mut buffer = vec![0u8; COPY_CHUNK];
    let mut total: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(FetchError::Network {
                    url: url.to_owned(),
                    reason: e.to_string(),
                });
            }
        };
        file.write_all(&buffer[..read]).map_err(io_error)?;
        total += read as u64;
    }

    file.flush().map_err(io_error)?;
    log::debug!("downloaded {total} bytes from {url}");
    Ok(())
}

/// Map a ureq error to a [`FetchError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> FetchError {
    match err {
        ureq::Error::StatusCode(status) => FetchError::HttpStatus {
            url: url.to_owned(),
            status: *status,
        },
        ureq::Error::TooManyRedirects => FetchError::RedirectLimit {
            url: url.to_owned(),
            limit: MAX_REDIRECTS,
        },
        other => FetchError::Network {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
#[path = "download_tests.rs"]
mod tests;
