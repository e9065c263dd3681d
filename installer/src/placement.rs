//! Placement of staged files into the install prefix.
//!
//! Primary binaries are copied into `<prefix>/bin` through a temporary
//! sibling and renamed into place, so a re-install replaces the old file
//! atomically. Aliases are relative symlinks to the primary's file name,
//! which keeps them valid after the staging directory is gone.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::artefact::extraction::StagingDirectory;
use crate::manifest::install_action::{BinaryName, InstallAction, InstallRole};

/// Executable mode applied to installed primary binaries.
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Errors arising while placing files.
#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    /// An action's source file is absent from the extracted archive.
    #[error("install action {action_index} expects {} in the archive, but it is missing", entry.display())]
    MissingEntry {
        /// Zero-based index of the failing action.
        action_index: usize,
        /// The source path the action named.
        entry: PathBuf,
    },

    /// The bin directory could not be created.
    #[error("failed to create {path}: {source}")]
    BinDir {
        /// The directory that could not be created.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// Copying, renaming or linking failed.
    #[error("install action {action_index} failed at {path}: {source}")]
    Filesystem {
        /// Zero-based index of the failing action.
        action_index: usize,
        /// The destination being written.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
}

/// A placement error together with the paths already written.
///
/// Placement performs no rollback; callers report `placed` so the user knows
/// what was left behind.
#[derive(Debug)]
pub struct PlacementFailure {
    /// The originating error.
    pub error: PlacementError,
    /// Paths written before the failure, in action order.
    pub placed: Vec<Utf8PathBuf>,
}

/// One installed name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledEntry {
    /// Role of the action that produced it.
    pub role: InstallRole,
    /// The name under `bin/`.
    pub name: BinaryName,
    /// Absolute path of the installed file or symlink.
    pub path: Utf8PathBuf,
}

/// The files an install run placed, in action order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledLayout {
    bin_dir: Utf8PathBuf,
    entries: Vec<InstalledEntry>,
}

impl InstalledLayout {
    /// The bin directory everything was placed in.
    #[must_use]
    pub fn bin_dir(&self) -> &Utf8Path {
        &self.bin_dir
    }

    /// Installed entries in action order.
    #[must_use]
    pub fn entries(&self) -> &[InstalledEntry] {
        &self.entries
    }

    /// Installed path for `name`, if this run placed it.
    #[must_use]
    pub fn path_of(&self, name: &str) -> Option<&Utf8Path> {
        self.entries
            .iter()
            .find(|entry| entry.name.as_str() == name)
            .map(|entry| entry.path.as_path())
    }

    /// Paths in action order.
    #[must_use]
    pub fn paths(&self) -> Vec<Utf8PathBuf> {
        self.entries.iter().map(|entry| entry.path.clone()).collect()
    }
}

/// Places staged files under `<prefix>/bin`.
#[derive(Debug, Clone)]
pub struct Installer {
    bin_dir: Utf8PathBuf,
}

impl Installer {
    /// Create an installer targeting `<prefix>/bin`.
    #[must_use]
    pub fn new(prefix: &Utf8Path) -> Self {
        Self {
            bin_dir: bin_dir_for(prefix),
        }
    }

    /// The directory files are placed in.
    #[must_use]
    pub fn bin_dir(&self) -> &Utf8Path {
        &self.bin_dir
    }

    /// Run every action in order against `staging`.
    ///
    /// # Errors
    ///
    /// Returns a [`PlacementFailure`] carrying [`PlacementError::MissingEntry`]
    /// when a source is absent, or a filesystem error, together with the
    /// paths already written.
    pub fn install(
        &self,
        staging: &StagingDirectory,
        actions: &[InstallAction],
    ) -> Result<InstalledLayout, PlacementFailure> {
        let mut entries: Vec<InstalledEntry> = Vec::with_capacity(actions.len());
        let fail = |error, entries: &[InstalledEntry]| PlacementFailure {
            error,
            placed: entries.iter().map(|entry| entry.path.clone()).collect(),
        };

        fs::create_dir_all(&self.bin_dir).map_err(|source| {
            fail(
                PlacementError::BinDir {
                    path: self.bin_dir.clone(),
                    source,
                },
                &entries,
            )
        })?;

        for (action_index, action) in actions.iter().enumerate() {
            let name = action.installed_name();
            let path = self.bin_dir.join(name.as_str());
            let result = match action {
                InstallAction::PrimaryBinary { source, .. } => {
                    let Some(staged) = staging.resolve(source) else {
                        return Err(fail(
                            PlacementError::MissingEntry {
                                action_index,
                                entry: source.clone(),
                            },
                            &entries,
                        ));
                    };
                    self.place_primary(&staged, &path)
                }
                InstallAction::SymlinkAlias { target, .. } => place_alias(target, &path),
            };
            result.map_err(|source| {
                fail(
                    PlacementError::Filesystem {
                        action_index,
                        path: path.clone(),
                        source,
                    },
                    &entries,
                )
            })?;

            log::info!("installed {action}");
            entries.push(InstalledEntry {
                role: action.role(),
                name: name.clone(),
                path,
            });
        }

        Ok(InstalledLayout {
            bin_dir: self.bin_dir.clone(),
            entries,
        })
    }

    fn place_primary(&self, staged: &Path, dest: &Utf8Path) -> io::Result<()> {
        let mut temp = tempfile::Builder::new()
            .prefix(".pour-")
            .suffix(".tmp")
            .tempfile_in(&self.bin_dir)?;
        let mut source = fs::File::open(staged)?;
        io::copy(&mut source, temp.as_file_mut())?;
        temp.as_file().sync_all()?;
        make_executable(temp.path())?;
        temp.persist(dest).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Return `<prefix>/bin`.
#[must_use]
pub fn bin_dir_for(prefix: &Utf8Path) -> Utf8PathBuf {
    prefix.join("bin")
}

/// Replace whatever file or symlink sits at `link` with a symlink to `target`.
fn place_alias(target: &BinaryName, link: &Utf8Path) -> io::Result<()> {
    match fs::symlink_metadata(link) {
        Ok(meta) if meta.is_dir() => {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                "a directory occupies the alias name",
            ));
        }
        Ok(_) => fs::remove_file(link)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    create_symlink(Path::new(target.as_str()), link.as_std_path())
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

/// Set `rwxr-xr-x`.
#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(EXECUTABLE_MODE))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
#[path = "placement_tests.rs"]
mod tests;
