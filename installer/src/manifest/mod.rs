//! Formula manifest model, parsing, and validation.
//!
//! A manifest is the declarative description of one installable package:
//! identity, pinned version, download URL template, expected SHA-256,
//! platform constraint, install actions, and a smoke test. Loading is pure;
//! a manifest that fails any check never reaches the install pipeline.
//!
//! # Sub-modules
//!
//! - [`error`] - Validation error taxonomy (`ManifestError`).
//! - [`install_action`] - Role-tagged install actions and alias resolution.
//! - [`manifest_parser`] - TOML loading (`parse_manifest`, `load_manifest`).
//! - [`package`] - The validated `PackageManifest`.
//! - [`package_name`] - Package identifier newtype.
//! - [`platform`] - Architecture/OS constraints and host detection.
//! - [`sha256_digest`] - SHA-256 digest newtype with placeholder rejection.
//! - [`test_command`] - Post-install smoke test declaration.
//! - [`url_template`] - Version-substituting download URL template.

pub mod error;
pub mod install_action;
pub mod manifest_parser;
pub mod package;
pub mod package_name;
pub mod platform;
pub mod sha256_digest;
pub mod test_command;
pub mod url_template;

pub use error::ManifestError;
pub use package::PackageManifest;
