//! Resolved installer configuration.
//!
//! Command-line flags win over environment variables (handled by clap), and
//! both win over the defaults resolved here: the prefix falls back to
//! `$HOME/.local`.

use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;

use crate::cli::{InstallArgs, PREFIX_ENV};
use crate::dirs::BaseDirs;
use crate::pipeline::PipelineOptions;

/// Errors resolving the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No prefix was given and no home directory could be found.
    #[error("no install prefix: pass --prefix or set {PREFIX_ENV}")]
    NoPrefix,

    /// The home directory is not valid UTF-8.
    #[error("default prefix {} is not valid UTF-8; pass --prefix", path.display())]
    NonUtf8Prefix {
        /// The offending path.
        path: PathBuf,
    },
}

/// Settings for one `pour install` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerConfig {
    /// Manifest path.
    pub manifest: Utf8PathBuf,
    /// Install prefix.
    pub prefix: Utf8PathBuf,
    /// Download timeout.
    pub fetch_timeout: Duration,
    /// Smoke test timeout.
    pub smoke_timeout: Duration,
    /// Print the plan only.
    pub dry_run: bool,
    /// Suppress progress output.
    pub quiet: bool,
}

impl InstallerConfig {
    /// Resolve `args` against `dirs`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when no prefix is given and none can be
    /// derived from the home directory.
    pub fn resolve(
        args: &InstallArgs,
        quiet: bool,
        dirs: &dyn BaseDirs,
    ) -> Result<Self, ConfigError> {
        let prefix = match &args.prefix {
            Some(prefix) => prefix.clone(),
            None => {
                let path = dirs.default_prefix().ok_or(ConfigError::NoPrefix)?;
                Utf8PathBuf::from_path_buf(path)
                    .map_err(|path| ConfigError::NonUtf8Prefix { path })?
            }
        };
        Ok(Self {
            manifest: args.manifest.clone(),
            prefix,
            fetch_timeout: Duration::from_secs(args.timeout),
            smoke_timeout: Duration::from_secs(args.smoke_timeout),
            dry_run: args.dry_run,
            quiet,
        })
    }

    /// Pipeline options for this configuration.
    #[must_use]
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            smoke_timeout: self.smoke_timeout,
            quiet: self.quiet,
            ..PipelineOptions::new(self.prefix.clone())
        }
    }
}
