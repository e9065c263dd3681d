//! Test support utilities for `pour` behavioural tests.
//!
//! A [`Scene`] is a throwaway directory split into a fixtures area, an
//! install prefix and a scratch root for download and staging directories.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pour::manifest::PackageManifest;
use pour::pipeline::PipelineOptions;
use pour::test_utils::{formula_manifest, sha256_file, utf8_path};
use tempfile::TempDir;

/// Scratch directories for one scenario.
pub struct Scene {
    _dir: TempDir,
    /// Archives and manifests written by the scenario.
    pub fixtures: PathBuf,
    /// Install prefix.
    pub prefix: PathBuf,
    /// Parent for download and staging directories.
    pub scratch: PathBuf,
}

impl Scene {
    /// Create the directory layout; the prefix itself is left absent.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let fixtures = dir.path().join("fixtures");
        let prefix = dir.path().join("prefix");
        let scratch = dir.path().join("scratch");
        fs::create_dir_all(&fixtures).expect("create fixtures dir");
        fs::create_dir_all(&scratch).expect("create scratch dir");
        Self {
            _dir: dir,
            fixtures,
            prefix,
            scratch,
        }
    }

    /// Pipeline options that keep every write inside the scene.
    pub fn options(&self) -> PipelineOptions {
        PipelineOptions {
            prefix: utf8_path(&self.prefix),
            smoke_timeout: Duration::from_secs(10),
            temp_root: Some(utf8_path(&self.scratch)),
            quiet: true,
        }
    }

    /// `<prefix>/bin`.
    pub fn bin_dir(&self) -> PathBuf {
        self.prefix.join("bin")
    }

    /// Whether `<prefix>/bin` is missing or empty.
    pub fn nothing_installed(&self) -> bool {
        let bin = self.bin_dir();
        !bin.exists() || fs::read_dir(bin).expect("read bin dir").next().is_none()
    }

    /// Path of the release archive for `name` in the fixtures area.
    pub fn archive_path(&self, name: &str) -> PathBuf {
        self.fixtures.join(format!("{name}-v1.2.3.tar.gz"))
    }

    /// URL template serving `name`'s archive from the fixtures area.
    pub fn url_template(&self, name: &str) -> String {
        format!(
            "file://{}/{name}-v{{version}}.tar.gz",
            self.fixtures.display()
        )
    }

    /// Manifest for `name` carrying the digest of `archive`.
    pub fn manifest_for(&self, name: &str, archive: &Path) -> PackageManifest {
        let sha = sha256_file(archive).expect("hash archive");
        formula_manifest(name, &self.url_template(name), &sha)
    }
}
