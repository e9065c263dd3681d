//! Formula manifest deserialization.
//!
//! Reads the TOML form of a formula into loosely typed raw structs, then
//! validates each field into its newtype. Validation happens field by field
//! rather than inside serde so that every failure surfaces as a specific
//! [`ManifestError`] variant instead of an opaque parse message.

use super::error::{ManifestError, Result};
use super::install_action::{RawInstallAction, validate_actions};
use super::package::{PackageInfo, PackageManifest, PackageSource};
use super::package_name::PackageName;
use super::platform::{Arch, Os, PlatformConstraint};
use super::sha256_digest::Sha256Digest;
use super::test_command::SmokeTest;
use super::url_template::UrlTemplate;
use log::debug;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    name: String,
    description: String,
    homepage: String,
    version: String,
    url: String,
    sha256: String,
    #[serde(default)]
    platform: Option<RawPlatform>,
    install: Vec<RawInstallAction>,
    test: RawTest,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPlatform {
    #[serde(default)]
    arch: Option<String>,
    #[serde(default)]
    os: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTest {
    command: String,
    expect: String,
}

/// Parse a TOML string into a validated [`PackageManifest`].
///
/// # Errors
///
/// Returns [`ManifestError::Parse`] for malformed TOML or missing/unknown
/// keys, and a field-specific variant for any value that fails validation
/// (including [`ManifestError::PlaceholderChecksum`] for an unset digest).
pub fn parse_manifest(toml_text: &str) -> Result<PackageManifest> {
    let raw: RawManifest = toml::from_str(toml_text)?;
    validate(raw)
}

/// Read and parse the manifest file at `path`.
///
/// # Errors
///
/// Returns [`ManifestError::Read`] if the file cannot be read, otherwise
/// any error from [`parse_manifest`].
pub fn load_manifest(path: &Path) -> Result<PackageManifest> {
    debug!("loading manifest from {}", path.display());
    let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_manifest(&text)
}

fn validate(raw: RawManifest) -> Result<PackageManifest> {
    let name = PackageName::try_from(raw.name)?;
    let version = semver::Version::parse(&raw.version).map_err(|e| {
        ManifestError::InvalidVersion {
            value: raw.version.clone(),
            reason: e.to_string(),
        }
    })?;
    let homepage = validate_homepage(raw.homepage)?;
    let url = UrlTemplate::try_from(raw.url)?;
    let sha256 = Sha256Digest::try_from(raw.sha256)?;
    let platform = raw.platform.map(validate_platform).transpose()?;
    let install = validate_actions(raw.install)?;
    let test = SmokeTest::new(&raw.test.command, &raw.test.expect, &install)?;

    let info = PackageInfo {
        name,
        description: raw.description,
        homepage,
        version,
    };
    let source = PackageSource {
        url,
        sha256,
        platform,
    };
    Ok(PackageManifest::new(info, source, install, test))
}

fn validate_homepage(homepage: String) -> Result<String> {
    let has_host = homepage
        .strip_prefix("https://")
        .or_else(|| homepage.strip_prefix("http://"))
        .is_some_and(|rest| !rest.is_empty());
    if has_host {
        Ok(homepage)
    } else {
        Err(ManifestError::InvalidHomepage { value: homepage })
    }
}

fn validate_platform(raw: RawPlatform) -> Result<PlatformConstraint> {
    let arch = raw.arch.as_deref().map(Arch::try_from).transpose()?;
    let os = raw.os.as_deref().map(Os::try_from).transpose()?;
    PlatformConstraint::new(arch, os)
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
