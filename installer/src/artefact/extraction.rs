//! Archive extraction for downloaded artefacts.
//!
//! Unpacks `.tar.gz`, `.tar.zst` and `.zip` archives into a fresh staging
//! directory with path traversal protection to prevent zip-slip attacks.
//! Link entries may only point at paths inside the staging directory and
//! never through a link unpacked earlier; once unpacking finishes every
//! symlink is resolved again and must stay under the staging root.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;

/// Archive container formats understood by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// Gzip-compressed tarball (`.tar.gz`, `.tgz`).
    TarGz,
    /// Zstandard-compressed tarball (`.tar.zst`, `.tzst`).
    TarZst,
    /// Zip archive (`.zip`).
    Zip,
}

impl ArchiveFormat {
    /// Detect the format from an archive file name.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::UnsupportedFormat`] for any other suffix.
    ///
    /// # Examples
    ///
    /// ```
    /// use pour::artefact::extraction::ArchiveFormat;
    ///
    /// let format = ArchiveFormat::from_file_name("stck-v0.1.3.tar.gz").expect("known suffix");
    /// assert_eq!(format, ArchiveFormat::TarGz);
    /// assert!(ArchiveFormat::from_file_name("stck.rar").is_err());
    /// ```
    pub fn from_file_name(name: &str) -> Result<Self, ExtractionError> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Ok(Self::TarGz)
        } else if lower.ends_with(".tar.zst") || lower.ends_with(".tzst") {
            Ok(Self::TarZst)
        } else if lower.ends_with(".zip") {
            Ok(Self::Zip)
        } else {
            Err(ExtractionError::UnsupportedFormat {
                file_name: name.to_owned(),
            })
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::TarGz => "tar.gz",
            Self::TarZst => "tar.zst",
            Self::Zip => "zip",
        };
        f.write_str(label)
    }
}

/// Trait for extracting artefact archives, enabling test mocking.
///
/// # Examples
///
/// ```
/// use pour::artefact::extraction::ArchiveExtractor;
///
/// let extractor = ArchiveExtractor;
/// // Use extractor.extract(archive_path, format, dest_dir) in production
/// # let _ = extractor;
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArtefactExtractor {
    /// Extract the archive at `archive_path` into `dest_dir`.
    ///
    /// Returns the relative paths of the regular files that were written.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry
    /// attempts to escape the destination directory.
    /// Returns [`ExtractionError::Corrupt`] when the stream cannot be decoded.
    /// Returns [`ExtractionError::EmptyArchive`] if no files are found.
    /// Returns [`ExtractionError::Io`] on local I/O failures.
    fn extract(
        &self,
        archive_path: &Path,
        format: ArchiveFormat,
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// The archive suffix names no supported format.
    #[error("unsupported archive format: {file_name}")]
    UnsupportedFormat {
        /// The archive file name.
        file_name: String,
    },

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive stream could not be decoded.
    #[error("corrupt {format} archive: {reason}")]
    Corrupt {
        /// The format being decoded.
        format: ArchiveFormat,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The archive contains no files.
    #[error("archive contains no files")]
    EmptyArchive,

    /// I/O error writing extracted files.
    #[error("extraction I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Default extractor using the `tar`, `flate2`, `zstd` and `zip` crates.
///
/// Validates each entry path before extraction to guard against
/// path traversal attacks (zip-slip).
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveExtractor;

impl ArtefactExtractor for ArchiveExtractor {
    fn extract(
        &self,
        archive_path: &Path,
        format: ArchiveFormat,
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>, ExtractionError> {
        let file = fs::File::open(archive_path)?;
        let extracted = match format {
            ArchiveFormat::TarGz => {
                extract_tar(flate2::read::GzDecoder::new(file), format, dest_dir)?
            }
            ArchiveFormat::TarZst => {
                let decoder = zstd::Decoder::new(file).map_err(|e| corrupt(format, &e))?;
                extract_tar(decoder, format, dest_dir)?
            }
            ArchiveFormat::Zip => extract_zip(file, dest_dir)?,
        };

        if extracted.is_empty() {
            return Err(ExtractionError::EmptyArchive);
        }
        log::debug!(
            "extracted {} file(s) from {} into {}",
            extracted.len(),
            archive_path.display(),
            dest_dir.display()
        );
        Ok(extracted)
    }
}

fn corrupt(format: ArchiveFormat, err: &dyn fmt::Display) -> ExtractionError {
    ExtractionError::Corrupt {
        format,
        reason: err.to_string(),
    }
}

/// Classify an I/O error raised while decoding or unpacking.
///
/// Decoder failures surface as `InvalidData`/`UnexpectedEof`/`InvalidInput`;
/// anything else is a local filesystem problem.
fn classify_io(format: ArchiveFormat, err: io::Error) -> ExtractionError {
    match err.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidInput => {
            corrupt(format, &err)
        }
        _ => ExtractionError::Io(err),
    }
}

fn extract_tar<R: Read>(
    reader: R,
    format: ArchiveFormat,
    dest_dir: &Path,
) -> Result<Vec<PathBuf>, ExtractionError> {
    let mut archive = tar::Archive::new(reader);
    archive.set_overwrite(true);
    let mut extracted = Vec::new();
    let mut links: HashSet<PathBuf> = HashSet::new();

    for entry_result in archive.entries().map_err(|e| corrupt(format, &e))? {
        let mut entry = entry_result.map_err(|e| corrupt(format, &e))?;
        let entry_path = entry.path().map_err(|e| corrupt(format, &e))?.into_owned();
        validate_entry_path(&entry_path)?;
        let normalised = normalise(&entry_path);
        if normalised.ancestors().any(|ancestor| links.contains(ancestor)) {
            return Err(ExtractionError::PathTraversal {
                path: entry_path.display().to_string(),
            });
        }

        let entry_type = entry.header().entry_type();
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            let target = entry
                .link_name()
                .map_err(|e| corrupt(format, &e))?
                .ok_or_else(|| corrupt(format, &"link entry without a target"))?
                .into_owned();
            validate_link_target(&entry_path, &target, entry_type.is_hard_link(), &links)?;
        }

        if !entry.unpack_in(dest_dir).map_err(|e| classify_io(format, e))? {
            return Err(ExtractionError::PathTraversal {
                path: entry_path.display().to_string(),
            });
        }

        if entry_type.is_symlink() {
            links.insert(normalised);
        } else if entry_type.is_file() {
            extracted.push(entry_path);
        }
    }

    Ok(extracted)
}

fn extract_zip(file: fs::File, dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let format = ArchiveFormat::Zip;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| corrupt(format, &e))?;
    let mut extracted = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| corrupt(format, &e))?;
        let raw_name = entry.name().to_owned();
        validate_entry_path(Path::new(&raw_name))?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| ExtractionError::PathTraversal {
                path: raw_name.clone(),
            })?;
        let out_path = dest_dir.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&out_path)?;
        io::copy(&mut entry, &mut out).map_err(|e| classify_io(format, e))?;
        apply_zip_mode(&out_path, entry.unix_mode())?;
        extracted.push(relative);
    }

    Ok(extracted)
}

#[cfg(unix)]
fn apply_zip_mode(path: &Path, mode: Option<u32>) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn apply_zip_mode(_path: &Path, _mode: Option<u32>) -> io::Result<()> {
    Ok(())
}

/// Validate that an entry path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path.components().any(|component| {
            matches!(
                component,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

/// Keep only the normal components of an archive path.
fn normalise(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| matches!(component, Component::Normal(_)))
        .collect()
}

/// Validate that a link entry resolves inside the destination directory.
///
/// Symlink targets are relative to the link's parent; hard link targets are
/// relative to the archive root. `links` holds the symlinks unpacked so far;
/// a target may name one of them but not walk through it, since the walk
/// below cannot see where it leads.
fn validate_link_target(
    entry: &Path,
    target: &Path,
    hard: bool,
    links: &HashSet<PathBuf>,
) -> Result<(), ExtractionError> {
    let reject = || ExtractionError::PathTraversal {
        path: format!("{} -> {}", entry.display(), target.display()),
    };
    if target.is_absolute() {
        return Err(reject());
    }

    let base = if hard {
        Path::new("")
    } else {
        entry.parent().unwrap_or_else(|| Path::new(""))
    };
    let joined = base.join(target);
    let mut components = joined.components().peekable();
    let mut walked = PathBuf::new();
    while let Some(component) = components.next() {
        match component {
            Component::Normal(part) => {
                walked.push(part);
                if components.peek().is_some() && links.contains(&walked) {
                    return Err(reject());
                }
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if !walked.pop() {
                    return Err(reject());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(reject()),
        }
    }
    Ok(())
}

/// Check that every symlink under `root` resolves inside it.
///
/// Directory symlinks are not descended into. Dangling links are left alone
/// because nothing can be installed through them.
fn ensure_links_stay_inside(root: &Path, canonical_root: &Path) -> Result<(), ExtractionError> {
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(entry.path());
                continue;
            }
            if !file_type.is_symlink() {
                continue;
            }
            let path = entry.path();
            let escapes = match fs::canonicalize(&path) {
                Ok(real) => !real.starts_with(canonical_root),
                Err(e) => e.kind() != io::ErrorKind::NotFound,
            };
            if escapes {
                let relative = path.strip_prefix(root).unwrap_or(&path);
                return Err(ExtractionError::PathTraversal {
                    path: relative.display().to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Extracted archive contents living in their own temporary directory.
///
/// Dropping the value deletes the directory.
#[derive(Debug)]
pub struct StagingDirectory {
    dir: TempDir,
    canonical_root: PathBuf,
    content_root: PathBuf,
    files: Vec<PathBuf>,
}

impl StagingDirectory {
    /// The directory install sources resolve against.
    ///
    /// When the archive holds a single top-level directory and nothing else,
    /// this is that directory; otherwise it is the extraction root.
    #[must_use]
    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    /// The extraction root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Relative paths of the regular files that were extracted.
    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Resolve an install `source` to a staged file, if present.
    ///
    /// The content root is tried first, then the extraction root. A
    /// candidate that resolves outside the extraction root is ignored.
    #[must_use]
    pub fn resolve(&self, source: &Path) -> Option<PathBuf> {
        [self.content_root.as_path(), self.dir.path()]
            .into_iter()
            .map(|base| base.join(source))
            .find(|candidate| {
                candidate.is_file()
                    && fs::canonicalize(candidate)
                        .is_ok_and(|real| real.starts_with(&self.canonical_root))
            })
    }
}

/// Extract `archive_path` into a new staging directory.
///
/// The format is taken from `file_name`. Staging directories are created
/// under `temp_root` when given.
///
/// # Errors
///
/// Returns [`ExtractionError::UnsupportedFormat`] for unknown suffixes,
/// [`ExtractionError::PathTraversal`] when a symlink left in the staging
/// directory resolves outside it, and propagates extractor failures
/// unchanged.
pub fn extract_artefact(
    archive_path: &Path,
    file_name: &str,
    extractor: &dyn ArtefactExtractor,
    temp_root: Option<&Path>,
) -> Result<StagingDirectory, ExtractionError> {
    let format = ArchiveFormat::from_file_name(file_name)?;
    let mut builder = tempfile::Builder::new();
    builder.prefix("pour-staging-");
    let dir = match temp_root {
        Some(root) => builder.tempdir_in(root)?,
        None => builder.tempdir()?,
    };

    let files = extractor.extract(archive_path, format, dir.path())?;
    let canonical_root = fs::canonicalize(dir.path())?;
    ensure_links_stay_inside(dir.path(), &canonical_root)?;
    let content_root =
        single_top_level_dir(dir.path())?.unwrap_or_else(|| dir.path().to_path_buf());
    Ok(StagingDirectory {
        dir,
        canonical_root,
        content_root,
        files,
    })
}

/// Return the lone top-level directory of `root`, if that is all it holds.
fn single_top_level_dir(root: &Path) -> io::Result<Option<PathBuf>> {
    let mut entries = fs::read_dir(root)?;
    let Some(first) = entries.next().transpose()? else {
        return Ok(None);
    };
    if entries.next().is_some() || !first.file_type()?.is_dir() {
        return Ok(None);
    }
    Ok(Some(first.path()))
}

#[cfg(test)]
#[path = "extraction_tests.rs"]
mod tests;
