//! Directory resolution abstraction for platform-specific paths.
//!
//! The default install prefix is `$HOME/.local`, so binaries land in
//! `~/.local/bin` alongside other per-user tools. Tests substitute their
//! own [`BaseDirs`] to avoid touching the real home directory.

use std::path::PathBuf;

/// Source of user directories.
pub trait BaseDirs {
    /// The user's home directory, if it can be determined.
    fn home_dir(&self) -> Option<PathBuf>;

    /// The default install prefix, `$HOME/.local`.
    fn default_prefix(&self) -> Option<PathBuf> {
        self.home_dir().map(|home| home.join(".local"))
    }
}

/// [`BaseDirs`] backed by `directories-next`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBaseDirs;

impl BaseDirs for SystemBaseDirs {
    fn home_dir(&self) -> Option<PathBuf> {
        directories_next::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
    }
}
