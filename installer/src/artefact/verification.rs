//! Integrity verification for downloaded artefacts.
//!
//! The archive's SHA-256 digest is computed by streaming the file and
//! compared with the manifest's declared digest before anything is
//! extracted. There is no way to skip or downgrade the check.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::manifest::sha256_digest::Sha256Digest;

const READ_CHUNK: usize = 8192;

/// Errors arising from integrity verification.
#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    /// The computed digest differs from the declared one.
    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    Mismatch {
        /// The archive that was hashed.
        path: PathBuf,
        /// Digest declared by the manifest.
        expected: Sha256Digest,
        /// Digest computed from the file.
        actual: Sha256Digest,
    },

    /// The archive could not be read.
    #[error("failed to read {path} for hashing: {source}")]
    Io {
        /// The archive that was being hashed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
}

/// Compute the SHA-256 digest of the file at `path`.
///
/// # Errors
///
/// Returns [`ChecksumError::Io`] if the file cannot be opened or read.
///
/// # Examples
///
/// ```
/// use pour::artefact::verification::compute_sha256;
///
/// let dir = tempfile::tempdir().expect("temp dir");
/// let path = dir.path().join("data");
/// std::fs::write(&path, b"test").expect("write");
/// let digest = compute_sha256(&path).expect("hash");
/// assert_eq!(
///     digest.as_str(),
///     "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
/// );
/// ```
pub fn compute_sha256(path: &Path) -> Result<Sha256Digest, ChecksumError> {
    let io_error = |source: io::Error| ChecksumError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = fs::File::open(path).map_err(io_error)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; READ_CHUNK];
    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_error(e)),
        };
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(Sha256Digest::from_bytes(&hasher.finalize()))
}

/// Hash the file at `path` and compare it with `expected`.
///
/// Returns the observed digest on success.
///
/// # Errors
///
/// Returns [`ChecksumError::Mismatch`] when the digests differ and
/// [`ChecksumError::Io`] when the file cannot be read.
pub fn verify_digest(path: &Path, expected: &Sha256Digest) -> Result<Sha256Digest, ChecksumError> {
    let actual = compute_sha256(path)?;
    if actual == *expected {
        log::debug!("checksum verified for {}: {actual}", path.display());
        Ok(actual)
    } else {
        Err(ChecksumError::Mismatch {
            path: path.to_path_buf(),
            expected: expected.clone(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sha256_hex;
    use rstest::rstest;

    fn write_temp(contents: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("archive.tar.gz");
        fs::write(&path, contents).expect("write file");
        (dir, path)
    }

    #[test]
    fn computes_known_digest() {
        let (_dir, path) = write_temp(b"test");
        let digest = compute_sha256(&path).expect("hash");
        assert_eq!(
            digest.as_str(),
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn digest_spans_multiple_chunks() {
        let contents = vec![7u8; READ_CHUNK * 3 + 17];
        let (_dir, path) = write_temp(&contents);
        let digest = compute_sha256(&path).expect("hash");
        assert_eq!(digest.as_str(), sha256_hex(&contents));
    }

    #[rstest]
    #[case::lowercase(false)]
    #[case::uppercase(true)]
    fn matching_digest_verifies(#[case] uppercase: bool) {
        let (_dir, path) = write_temp(b"payload");
        let hex = sha256_hex(b"payload");
        let declared = if uppercase { hex.to_uppercase() } else { hex.clone() };
        let expected = Sha256Digest::try_from(declared.as_str()).expect("valid digest");

        let observed = verify_digest(&path, &expected).expect("digest matches");
        assert_eq!(observed.as_str(), hex);
    }

    #[test]
    fn mismatched_digest_reports_both_values() {
        let (_dir, path) = write_temp(b"tampered");
        let expected =
            Sha256Digest::try_from(sha256_hex(b"original").as_str()).expect("valid digest");

        let err = verify_digest(&path, &expected).expect_err("digest differs");
        match err {
            ChecksumError::Mismatch {
                expected: declared,
                actual,
                ..
            } => {
                assert_eq!(declared, expected);
                assert_eq!(actual.as_str(), sha256_hex(b"tampered"));
            }
            other => panic!("expected Mismatch, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = compute_sha256(&dir.path().join("missing")).expect_err("no file");
        assert!(matches!(err, ChecksumError::Io { .. }));
    }
}
