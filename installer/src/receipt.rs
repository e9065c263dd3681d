//! Install receipts.
//!
//! After a successful run the installer records what it placed at
//! `<prefix>/var/pour/receipts/<package>.json`. Receipts are informational;
//! failing to write one does not fail the install.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::manifest::PackageManifest;
use crate::manifest::sha256_digest::Sha256Digest;
use crate::placement::{InstalledEntry, InstalledLayout};

const RECEIPTS_DIR: &str = "var/pour/receipts";

/// What a successful install placed, and from where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReceipt {
    name: String,
    version: String,
    source_url: String,
    sha256: Sha256Digest,
    installed_at: u64,
    entries: Vec<InstalledEntry>,
}

impl InstallReceipt {
    /// Build a receipt for `manifest` installed as `layout`.
    #[must_use]
    pub fn new(manifest: &PackageManifest, layout: &InstalledLayout, source_url: &str) -> Self {
        let installed_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());
        Self {
            name: manifest.name().to_string(),
            version: manifest.version().to_string(),
            source_url: source_url.to_owned(),
            sha256: manifest.sha256().clone(),
            installed_at,
            entries: layout.entries().to_vec(),
        }
    }

    /// The package name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Errors that prevent receipt persistence.
#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    /// Creating the receipts directory failed.
    #[error("failed to create receipts directory {path}: {source}")]
    CreateDirectory {
        /// Directory path that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Serializing the receipt failed.
    #[error("failed to serialize receipt: {source}")]
    Serialize {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Writing the receipt file failed.
    #[error("failed to write receipt {path}: {source}")]
    Write {
        /// File path that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Return `<prefix>/var/pour/receipts/<package>.json`.
#[must_use]
pub fn receipt_path(prefix: &Path, package: &str) -> PathBuf {
    prefix.join(RECEIPTS_DIR).join(format!("{package}.json"))
}

/// Write `receipt` under `prefix`, replacing any earlier one.
///
/// # Errors
///
/// Returns a [`ReceiptError`] if the directory or file cannot be written.
pub fn write_receipt(prefix: &Path, receipt: &InstallReceipt) -> Result<PathBuf, ReceiptError> {
    let path = receipt_path(prefix, receipt.name());
    let dir = prefix.join(RECEIPTS_DIR);
    std::fs::create_dir_all(&dir).map_err(|source| ReceiptError::CreateDirectory {
        path: dir.clone(),
        source,
    })?;

    let json = serde_json::to_string_pretty(receipt)
        .map_err(|source| ReceiptError::Serialize { source })?;
    std::fs::write(&path, json).map_err(|source| ReceiptError::Write {
        path: path.clone(),
        source,
    })?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artefact::extraction::{ArchiveExtractor, extract_artefact};
    use crate::placement::Installer;
    use crate::test_utils::{ArchiveEntry, formula_manifest, sha256_hex, utf8_path, write_tar_gz};

    #[test]
    fn receipt_records_entries_and_source() {
        let scratch = tempfile::tempdir().expect("create tempdir");
        let archive = scratch.path().join("tool.tar.gz");
        write_tar_gz(&archive, &[ArchiveEntry::executable("tool", "bin")]).expect("archive");
        let staging =
            extract_artefact(&archive, "tool.tar.gz", &ArchiveExtractor, None).expect("extract");
        let manifest = formula_manifest(
            "tool",
            "https://example.test/tool-{version}.tar.gz",
            &sha256_hex(b"x"),
        );
        let prefix = utf8_path(&scratch.path().join("prefix"));
        let layout = Installer::new(&prefix)
            .install(&staging, manifest.install_actions())
            .expect("install");

        let url = "https://example.test/tool-1.2.3.tar.gz";
        let receipt = InstallReceipt::new(&manifest, &layout, url);
        let path = write_receipt(prefix.as_std_path(), &receipt).expect("write receipt");
        assert_eq!(path, prefix.as_std_path().join("var/pour/receipts/tool.json"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read receipt"))
                .expect("valid json");
        assert_eq!(json["name"], "tool");
        assert_eq!(json["version"], "1.2.3");
        assert_eq!(json["sha256"], sha256_hex(b"x"));
        assert_eq!(json["entries"][0]["role"], "primary-binary");
        assert_eq!(json["entries"][1]["name"], "tool-alias");
    }

    #[test]
    fn unwritable_prefix_is_reported() {
        let scratch = tempfile::tempdir().expect("create tempdir");
        let blocker = scratch.path().join("file");
        std::fs::write(&blocker, "not a directory").expect("write blocker");
        let receipt = InstallReceipt {
            name: "tool".to_owned(),
            version: "1.0.0".to_owned(),
            source_url: "file:///tool.tar.gz".to_owned(),
            sha256: crate::manifest::sha256_digest::Sha256Digest::from_bytes(&[1; 32]),
            installed_at: 0,
            entries: Vec::new(),
        };

        let err = write_receipt(&blocker, &receipt).expect_err("prefix is a file");
        assert!(matches!(err, ReceiptError::CreateDirectory { .. }));
    }
}
