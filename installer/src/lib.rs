//! `pour` installer library.
//!
//! Installs one prebuilt binary described by a TOML formula: the archive is
//! downloaded, checked against its declared SHA-256 digest, unpacked into a
//! staging directory, placed under `<prefix>/bin` and smoke-tested. The
//! `pour` binary is a thin wrapper; tests and other tools can drive the
//! [`pipeline::Orchestrator`] directly with their own fetcher or extractor.
//!
//! # Modules
//!
//! - [`artefact`] - Download, digest verification and archive extraction
//! - [`cancel`] - Cooperative cancellation flag
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Resolved installer configuration
//! - [`dirs`] - Directory resolution abstraction for the default prefix
//! - [`error`] - Run-level error type, categories and exit codes
//! - [`lock`] - Per-package install lock
//! - [`manifest`] - Formula manifest schema and validation
//! - [`output`] - Progress, success and failure text
//! - [`pipeline`] - The install state machine
//! - [`placement`] - Placing binaries and aliases under the prefix
//! - [`receipt`] - Install receipts
//! - [`smoke`] - Post-install smoke test

pub mod artefact;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod dirs;
pub mod error;
pub mod lock;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod placement;
pub mod receipt;
pub mod smoke;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
