//! Install pipeline orchestration.
//!
//! Drives one formula through
//! `Idle → Fetching → Verifying → Extracting → Installing → Validating → Done`,
//! moving to `Failed` from whichever stage breaks. Every stage's error is
//! carried through unchanged in [`PipelineFailure`], together with the stage
//! it came from and any files already placed. The download and staging
//! directories are owned by the run and removed when it ends, whatever the
//! outcome. There are no retries.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};

use crate::artefact::download::{ArtefactFetcher, fetch_artefact};
use crate::artefact::extraction::{ArtefactExtractor, extract_artefact};
use crate::artefact::verification::verify_digest;
use crate::cancel::CancelFlag;
use crate::error::InstallError;
use crate::lock::{InstallLock, LockError};
use crate::manifest::PackageManifest;
use crate::manifest::manifest_parser::load_manifest;
use crate::manifest::platform::HostPlatform;
use crate::manifest::sha256_digest::Sha256Digest;
use crate::output::write_stderr_line;
use crate::placement::{InstalledLayout, Installer};
use crate::receipt::{InstallReceipt, write_receipt};
use crate::smoke::{self, DEFAULT_SMOKE_TIMEOUT, ValidationResult};

/// Pipeline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallState {
    /// Nothing has started.
    Idle,
    /// Downloading the artefact.
    Fetching,
    /// Checking the artefact digest.
    Verifying,
    /// Unpacking into the staging directory.
    Extracting,
    /// Placing files under the prefix.
    Installing,
    /// Running the smoke test.
    Validating,
    /// Installed and validated.
    Done,
    /// Stopped by an error.
    Failed,
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Verifying => "verifying",
            Self::Extracting => "extracting",
            Self::Installing => "installing",
            Self::Validating => "validating",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Options that shape a run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Install prefix; binaries land in `<prefix>/bin`.
    pub prefix: Utf8PathBuf,
    /// How long the smoke test may run.
    pub smoke_timeout: Duration,
    /// Parent for download and staging directories; the system temp
    /// directory when `None`.
    pub temp_root: Option<Utf8PathBuf>,
    /// When true, suppress progress output.
    pub quiet: bool,
}

impl PipelineOptions {
    /// Options for `prefix` with default timeouts.
    #[must_use]
    pub fn new(prefix: impl Into<Utf8PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            smoke_timeout: DEFAULT_SMOKE_TIMEOUT,
            temp_root: None,
            quiet: false,
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct InstallReport {
    /// Package name.
    pub package: String,
    /// Package version.
    pub version: String,
    /// The resolved download URL.
    pub source_url: String,
    /// The verified digest.
    pub digest: Sha256Digest,
    /// Installed files.
    pub layout: InstalledLayout,
    /// Smoke test outcome.
    pub validation: ValidationResult,
    /// Receipt path, when one was written.
    pub receipt: Option<PathBuf>,
    /// States entered, in order, ending with [`InstallState::Done`].
    pub transitions: Vec<InstallState>,
}

/// A failed run.
#[derive(Debug, thiserror::Error)]
#[error("install failed while {failed_in}: {error}")]
pub struct PipelineFailure {
    /// The state the run was in when it failed.
    pub failed_in: InstallState,
    /// The originating error, unchanged.
    #[source]
    pub error: InstallError,
    /// Files placed under the prefix before the failure.
    pub placed: Vec<Utf8PathBuf>,
}

impl PipelineFailure {
    fn before_start(error: impl Into<InstallError>) -> Self {
        Self {
            failed_in: InstallState::Idle,
            error: error.into(),
            placed: Vec::new(),
        }
    }

    /// Whether the prefix was left with a partial install.
    ///
    /// A failed smoke test leaves a complete install behind and does not
    /// count.
    #[must_use]
    pub fn left_partial_install(&self) -> bool {
        !self.placed.is_empty() && !matches!(self.error, InstallError::SmokeTest(_))
    }
}

/// Runs formulas through the install state machine.
pub struct Orchestrator<'a> {
    fetcher: &'a dyn ArtefactFetcher,
    extractor: &'a dyn ArtefactExtractor,
    host: HostPlatform,
    cancel: CancelFlag,
    options: PipelineOptions,
}

impl<'a> Orchestrator<'a> {
    /// Build an orchestrator for the current host.
    #[must_use]
    pub fn new(
        fetcher: &'a dyn ArtefactFetcher,
        extractor: &'a dyn ArtefactExtractor,
        options: PipelineOptions,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            host: HostPlatform::current(),
            cancel: CancelFlag::new(),
            options,
        }
    }

    /// Check platform constraints against `host` instead of this machine.
    #[must_use]
    pub fn with_host(mut self, host: HostPlatform) -> Self {
        self.host = host;
        self
    }

    /// Observe `cancel` between stages and during the download.
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// The options this orchestrator runs with.
    #[must_use]
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Load the manifest at `path` and install it.
    ///
    /// # Errors
    ///
    /// A manifest that cannot be loaded fails with `failed_in` set to
    /// [`InstallState::Idle`]; otherwise see [`Orchestrator::install`].
    pub fn install_from_path(
        &self,
        path: &Path,
        stderr: &mut dyn Write,
    ) -> Result<InstallReport, PipelineFailure> {
        let manifest = load_manifest(path).map_err(PipelineFailure::before_start)?;
        self.install(&manifest, stderr)
    }

    /// Run `manifest` through the pipeline.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineFailure`] naming the failing state and carrying
    /// the stage's error unchanged.
    pub fn install(
        &self,
        manifest: &PackageManifest,
        stderr: &mut dyn Write,
    ) -> Result<InstallReport, PipelineFailure> {
        let mut run = Run::new(self.options.quiet, stderr);
        let result = self.drive(manifest, &mut run);
        if let Err(failure) = &result {
            log::warn!(
                "install of {} failed while {}: {}",
                manifest.name(),
                failure.failed_in,
                failure.error
            );
        }
        result
    }

    fn drive(
        &self,
        manifest: &PackageManifest,
        run: &mut Run<'_>,
    ) -> Result<InstallReport, PipelineFailure> {
        let temp_root = self.options.temp_root.as_deref().map(Utf8Path::as_std_path);
        let prefix = self.options.prefix.as_path();

        run.enter(InstallState::Fetching, format!("Downloading {}...", manifest.resolved_url()));
        self.checkpoint(run, &[])?;
        let artefact =
            fetch_artefact(manifest, &self.host, self.fetcher, &self.cancel, temp_root)
                .map_err(|e| run.fail(e, Vec::new()))?;

        run.enter(InstallState::Verifying, "Verifying checksum...");
        self.checkpoint(run, &[])?;
        let digest = verify_digest(artefact.path(), manifest.sha256())
            .map_err(|e| run.fail(e, Vec::new()))?;

        run.enter(InstallState::Extracting, format!("Extracting {}...", artefact.file_name()));
        self.checkpoint(run, &[])?;
        let staging =
            extract_artefact(artefact.path(), artefact.file_name(), self.extractor, temp_root)
                .map_err(|e| run.fail(e, Vec::new()))?;
        log::debug!(
            "staged {} file(s) under {}",
            staging.files().len(),
            staging.content_root().display()
        );

        let installer = Installer::new(prefix);
        run.enter(
            InstallState::Installing,
            format!("Installing into {}...", installer.bin_dir()),
        );
        self.checkpoint(run, &[])?;
        let package = manifest.name().as_str();
        let lock = InstallLock::acquire(prefix.as_std_path(), package, &self.cancel)
            .map_err(|e| match e {
                LockError::Cancelled { .. } => run.fail(InstallError::Cancelled, Vec::new()),
                LockError::Io { .. } => run.fail(e, Vec::new()),
            })?;
        self.checkpoint(run, &[])?;
        let layout = installer
            .install(&staging, manifest.install_actions())
            .map_err(|failure| run.fail(failure.error, failure.placed))?;

        run.enter(
            InstallState::Validating,
            format!("Running smoke test: {}", manifest.smoke_test()),
        );
        self.checkpoint(run, &layout.paths())?;
        let validation = smoke::validate(
            layout.bin_dir().as_std_path(),
            manifest.smoke_test(),
            self.options.smoke_timeout,
        )
        .map_err(|e| run.fail(e, layout.paths()))?;

        let receipt = InstallReceipt::new(manifest, &layout, artefact.source_url());
        let receipt = match write_receipt(prefix.as_std_path(), &receipt) {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!("could not record install receipt: {e}");
                None
            }
        };
        drop(lock);

        run.enter(InstallState::Done, "");
        Ok(InstallReport {
            package: manifest.name().to_string(),
            version: manifest.version().to_string(),
            source_url: artefact.source_url().to_owned(),
            digest,
            layout,
            validation,
            receipt,
            transitions: run.history.clone(),
        })
    }

    /// Fail with [`InstallError::Cancelled`] if cancellation was requested.
    fn checkpoint(&self, run: &mut Run<'_>, placed: &[Utf8PathBuf]) -> Result<(), PipelineFailure> {
        if self.cancel.is_cancelled() {
            return Err(run.fail(InstallError::Cancelled, placed.to_vec()));
        }
        Ok(())
    }
}

/// Offline integrity check of a local archive against a manifest.
///
/// # Errors
///
/// Returns [`InstallError::Manifest`] when the manifest cannot be loaded and
/// [`InstallError::Checksum`] when the digest differs or the archive cannot
/// be read.
pub fn verify_archive(manifest_path: &Path, archive: &Path) -> Result<Sha256Digest, InstallError> {
    let manifest = load_manifest(manifest_path)?;
    Ok(verify_digest(archive, manifest.sha256())?)
}

/// Per-run state tracking and progress reporting.
struct Run<'w> {
    state: InstallState,
    history: Vec<InstallState>,
    quiet: bool,
    stderr: &'w mut dyn Write,
}

impl<'w> Run<'w> {
    fn new(quiet: bool, stderr: &'w mut dyn Write) -> Self {
        Self {
            state: InstallState::Idle,
            history: Vec::new(),
            quiet,
            stderr,
        }
    }

    fn enter(&mut self, next: InstallState, message: impl AsRef<str>) {
        log::info!("{} -> {next}", self.state);
        self.state = next;
        self.history.push(next);
        let message = message.as_ref();
        if !self.quiet && !message.is_empty() {
            write_stderr_line(&mut *self.stderr, message);
        }
    }

    fn fail(
        &mut self,
        error: impl Into<InstallError>,
        placed: Vec<Utf8PathBuf>,
    ) -> PipelineFailure {
        let failed_in = self.state;
        log::info!("{failed_in} -> {}", InstallState::Failed);
        self.state = InstallState::Failed;
        self.history.push(InstallState::Failed);
        PipelineFailure {
            failed_in,
            error: error.into(),
            placed,
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
