//! The validated formula manifest.
//!
//! A [`PackageManifest`] is immutable once loaded; every field has already
//! passed validation, so the pipeline never has to re-check it.

use super::install_action::InstallAction;
use super::package_name::PackageName;
use super::platform::PlatformConstraint;
use super::sha256_digest::Sha256Digest;
use super::test_command::SmokeTest;
use super::url_template::UrlTemplate;
use semver::Version;

/// Descriptive metadata that plays no part in installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    /// Package identifier.
    pub name: PackageName,
    /// One-line description.
    pub description: String,
    /// Project homepage (http or https).
    pub homepage: String,
    /// Pinned release version.
    pub version: Version,
}

/// Where to get the archive and how to trust it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSource {
    /// Download URL template.
    pub url: UrlTemplate,
    /// Expected SHA-256 of the whole archive.
    pub sha256: Sha256Digest,
    /// Platform the archive is built for.
    pub platform: Option<PlatformConstraint>,
}

/// A fully validated installable package description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManifest {
    info: PackageInfo,
    source: PackageSource,
    install: Vec<InstallAction>,
    test: SmokeTest,
}

impl PackageManifest {
    /// Assemble a manifest from already validated parts.
    #[must_use]
    pub fn new(
        info: PackageInfo,
        source: PackageSource,
        install: Vec<InstallAction>,
        test: SmokeTest,
    ) -> Self {
        Self {
            info,
            source,
            install,
            test,
        }
    }

    /// Return the package name.
    #[must_use]
    pub fn name(&self) -> &PackageName {
        &self.info.name
    }

    /// Return the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.info.description
    }

    /// Return the homepage URI.
    #[must_use]
    pub fn homepage(&self) -> &str {
        &self.info.homepage
    }

    /// Return the pinned version.
    #[must_use]
    pub fn version(&self) -> &Version {
        &self.info.version
    }

    /// Return the platform constraint, if the formula declares one.
    #[must_use]
    pub fn platform(&self) -> Option<&PlatformConstraint> {
        self.source.platform.as_ref()
    }

    /// Return the download URL template.
    #[must_use]
    pub fn url_template(&self) -> &UrlTemplate {
        &self.source.url
    }

    /// Return the download URL with the version substituted.
    ///
    /// # Examples
    ///
    /// ```
    /// let manifest = pour::manifest::manifest_parser::parse_manifest(concat!(
    ///     "name = \"stck\"\n",
    ///     "description = \"Stacked PRs\"\n",
    ///     "homepage = \"https://github.com/brdv/stck\"\n",
    ///     "version = \"0.1.0\"\n",
    ///     "url = \"https://example/pkg-v{version}.tar.gz\"\n",
    ///     "sha256 = \"9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08\"\n",
    ///     "[[install]]\nrole = \"primary-binary\"\nsource = \"stck\"\n",
    ///     "[test]\ncommand = \"stck --help\"\nexpect = \"stck\"\n",
    /// ))
    /// .expect("valid manifest");
    /// assert_eq!(manifest.resolved_url(), "https://example/pkg-v0.1.0.tar.gz");
    /// ```
    #[must_use]
    pub fn resolved_url(&self) -> String {
        self.source.url.resolve(&self.info.version.to_string())
    }

    /// Return the expected archive digest.
    #[must_use]
    pub fn sha256(&self) -> &Sha256Digest {
        &self.source.sha256
    }

    /// Return the ordered install actions.
    #[must_use]
    pub fn install_actions(&self) -> &[InstallAction] {
        &self.install
    }

    /// Return the post-install smoke test.
    #[must_use]
    pub fn smoke_test(&self) -> &SmokeTest {
        &self.test
    }
}
