//! Role-tagged install actions.
//!
//! A formula lists what to take out of the archive and how to expose it under
//! `<prefix>/bin`. A `primary-binary` action copies a staged file; a
//! `symlink-alias` action adds another name that links to an already
//! installed primary binary. The list is ordered, and an alias must come after
//! the primary it points at.

use super::error::{ManifestError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Logical role of an installed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallRole {
    /// The main executable, copied from the archive.
    PrimaryBinary,
    /// An extra name that resolves to a primary binary.
    SymlinkAlias,
}

impl fmt::Display for InstallRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrimaryBinary => f.write_str("primary-binary"),
            Self::SymlinkAlias => f.write_str("symlink-alias"),
        }
    }
}

/// A file name that can live directly inside `<prefix>/bin`.
///
/// # Examples
///
/// ```
/// use pour::manifest::install_action::BinaryName;
///
/// assert!(BinaryName::try_from("git-stck").is_ok());
/// assert!(BinaryName::try_from("bin/stck").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BinaryName(String);

impl BinaryName {
    /// Return the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for BinaryName {
    type Error = String;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        if value.is_empty() {
            return Err("binary name must not be empty".to_owned());
        }
        if matches!(value, "." | "..") {
            return Err(format!("\"{value}\" is not a file name"));
        }
        if value.contains(['/', '\\', '\0']) {
            return Err(format!("\"{value}\" must be a plain file name"));
        }
        Ok(Self(value.to_owned()))
    }
}

impl AsRef<str> for BinaryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BinaryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated install action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "kebab-case")]
pub enum InstallAction {
    /// Copy `source` (relative to the archive root) to `bin/<name>`.
    PrimaryBinary {
        /// Path of the file inside the extracted archive.
        source: PathBuf,
        /// Installed file name.
        name: BinaryName,
    },
    /// Create `bin/<alias>` as a symlink to `bin/<target>`.
    SymlinkAlias {
        /// The additional name.
        alias: BinaryName,
        /// Installed name of the primary binary it resolves to.
        target: BinaryName,
    },
}

impl InstallAction {
    /// Return the role of this action.
    #[must_use]
    pub fn role(&self) -> InstallRole {
        match self {
            Self::PrimaryBinary { .. } => InstallRole::PrimaryBinary,
            Self::SymlinkAlias { .. } => InstallRole::SymlinkAlias,
        }
    }

    /// Return the name this action creates under `bin/`.
    #[must_use]
    pub fn installed_name(&self) -> &BinaryName {
        match self {
            Self::PrimaryBinary { name, .. } => name,
            Self::SymlinkAlias { alias, .. } => alias,
        }
    }
}

impl fmt::Display for InstallAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrimaryBinary { source, name } => {
                write!(f, "primary-binary {} -> bin/{name}", source.display())
            }
            Self::SymlinkAlias { alias, target } => {
                write!(f, "symlink-alias bin/{alias} -> {target}")
            }
        }
    }
}

/// Install action as written in the manifest, before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "role", rename_all = "kebab-case")]
pub enum RawInstallAction {
    /// `role = "primary-binary"`.
    PrimaryBinary {
        /// Path inside the archive.
        source: String,
        /// Installed name; defaults to the source's file name.
        #[serde(default)]
        name: Option<String>,
    },
    /// `role = "symlink-alias"`.
    SymlinkAlias {
        /// The alias name.
        alias: String,
        /// Primary binary it points at; defaults to the closest preceding one.
        #[serde(default)]
        target: Option<String>,
    },
}

/// Validate the raw action list and resolve defaults.
///
/// # Errors
///
/// Returns [`ManifestError::InvalidInstallAction`] for a malformed action,
/// a duplicate installed name, or an alias with no preceding primary, and
/// [`ManifestError::NoPrimaryBinary`] when no primary binary is declared.
pub fn validate_actions(raw: Vec<RawInstallAction>) -> Result<Vec<InstallAction>> {
    let mut actions = Vec::with_capacity(raw.len());
    let mut primaries: Vec<BinaryName> = Vec::new();
    let mut seen: HashSet<BinaryName> = HashSet::new();

    for (index, raw_action) in raw.into_iter().enumerate() {
        let invalid = |reason: String| ManifestError::InvalidInstallAction { index, reason };
        let action = match raw_action {
            RawInstallAction::PrimaryBinary { source, name } => {
                let source = validate_source(&source).map_err(invalid)?;
                let name = match name {
                    Some(name) => BinaryName::try_from(name.as_str()).map_err(invalid)?,
                    None => default_name(&source).map_err(invalid)?,
                };
                primaries.push(name.clone());
                InstallAction::PrimaryBinary { source, name }
            }
            RawInstallAction::SymlinkAlias { alias, target } => {
                let alias = BinaryName::try_from(alias.as_str()).map_err(invalid)?;
                let target = resolve_alias_target(target.as_deref(), &primaries).map_err(invalid)?;
                InstallAction::SymlinkAlias { alias, target }
            }
        };

        if !seen.insert(action.installed_name().clone()) {
            return Err(invalid(format!(
                "bin/{} is installed more than once",
                action.installed_name()
            )));
        }
        actions.push(action);
    }

    if primaries.is_empty() {
        return Err(ManifestError::NoPrimaryBinary);
    }
    Ok(actions)
}

/// Archive-relative source paths must stay inside the archive.
fn validate_source(source: &str) -> std::result::Result<PathBuf, String> {
    let path = Path::new(source);
    if source.is_empty() {
        return Err("source must not be empty".to_owned());
    }
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(format!(
                    "source \"{source}\" must be a relative path inside the archive"
                ));
            }
        }
    }
    Ok(path.to_path_buf())
}

fn default_name(source: &Path) -> std::result::Result<BinaryName, String> {
    let file_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| format!("cannot derive a name from \"{}\"", source.display()))?;
    BinaryName::try_from(file_name)
}

fn resolve_alias_target(
    target: Option<&str>,
    primaries: &[BinaryName],
) -> std::result::Result<BinaryName, String> {
    match target {
        Some(wanted) => primaries
            .iter()
            .find(|p| p.as_str() == wanted)
            .cloned()
            .ok_or_else(|| {
                format!("alias target \"{wanted}\" is not a primary binary declared earlier")
            }),
        None => primaries
            .last()
            .cloned()
            .ok_or_else(|| "symlink-alias must follow a primary-binary action".to_owned()),
    }
}
