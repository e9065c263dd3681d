//! Per-package install lock.
//!
//! Concurrent installs of the same package into the same prefix serialise
//! on an exclusive advisory lock at
//! `<prefix>/var/pour/locks/<package>.lock`. Installs of different packages
//! or into different prefixes do not contend.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use fs2::FileExt;

use crate::cancel::CancelFlag;

const LOCKS_DIR: &str = "var/pour/locks";

/// How long to wait between attempts while another install holds the lock.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// An exclusive lock held until dropped.
#[derive(Debug)]
pub struct InstallLock {
    file: File,
    path: PathBuf,
}

/// Errors arising while taking the lock.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// The lock file could not be created or locked.
    #[error("failed to lock {}: {source}", path.display())]
    Io {
        /// The lock file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// Cancellation was requested while waiting for the lock.
    #[error("cancelled while waiting for {}", path.display())]
    Cancelled {
        /// The lock file.
        path: PathBuf,
    },
}

impl InstallLock {
    /// Wait until the lock for `package` under `prefix` is held.
    ///
    /// While another install holds it, `cancel` is checked between attempts.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Io`] if the lock file cannot be created or
    /// locked, and [`LockError::Cancelled`] if `cancel` is set while waiting.
    pub fn acquire(prefix: &Path, package: &str, cancel: &CancelFlag) -> Result<Self, LockError> {
        let path = lock_path(prefix, package);
        let lock_error = |source: io::Error| LockError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(lock_error)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(lock_error)?;

        let mut announced = false;
        loop {
            if cancel.is_cancelled() {
                return Err(LockError::Cancelled { path: path.clone() });
            }
            match file.try_lock_exclusive() {
                Ok(()) => break,
                Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                    if !announced {
                        log::info!("waiting for another install of {package} to finish");
                        announced = true;
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(lock_error(e)),
            }
        }
        log::debug!("acquired install lock {}", path.display());

        Ok(Self { file, path })
    }

    /// The lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::warn!("failed to release install lock {}: {e}", self.path.display());
        }
    }
}

/// Return `<prefix>/var/pour/locks/<package>.lock`.
#[must_use]
pub fn lock_path(prefix: &Path, package: &str) -> PathBuf {
    prefix.join(LOCKS_DIR).join(format!("{package}.lock"))
}
