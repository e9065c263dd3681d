//! Platform constraints declared by a formula.
//!
//! A formula may restrict itself to an architecture, an operating system, or
//! both. Only the tags listed here are accepted; anything else is rejected
//! when the manifest is loaded, and the constraint is checked against the
//! running host before any network I/O happens.

use super::error::{ManifestError, Result};
use serde::Serialize;
use std::fmt;

/// Accepted architecture tags.
const SUPPORTED_ARCHES: &[&str] = &["arm64", "x86_64"];

/// Accepted operating system tags.
const SUPPORTED_OSES: &[&str] = &["macos", "linux", "windows"];

/// CPU architecture a package is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    /// 64-bit ARM (`aarch64`), spelled `arm64` in formulas.
    Arm64,
    /// 64-bit x86.
    X86_64,
}

impl Arch {
    /// Map a Rust `target_arch` name onto a formula tag.
    ///
    /// # Examples
    ///
    /// ```
    /// use pour::manifest::platform::Arch;
    ///
    /// assert_eq!(Arch::from_rust_arch("aarch64"), Some(Arch::Arm64));
    /// assert_eq!(Arch::from_rust_arch("riscv64"), None);
    /// ```
    #[must_use]
    pub fn from_rust_arch(arch: &str) -> Option<Self> {
        match arch {
            "aarch64" => Some(Self::Arm64),
            "x86_64" => Some(Self::X86_64),
            _ => None,
        }
    }

    /// Return the formula spelling of this architecture.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arm64 => "arm64",
            Self::X86_64 => "x86_64",
        }
    }
}

impl TryFrom<&str> for Arch {
    type Error = ManifestError;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "arm64" | "aarch64" => Ok(Self::Arm64),
            "x86_64" | "amd64" => Ok(Self::X86_64),
            other => Err(ManifestError::UnsupportedPlatform {
                field: "arch",
                value: other.to_owned(),
                expected: SUPPORTED_ARCHES.join(", "),
            }),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operating system a package is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Os {
    /// Apple macOS (Darwin).
    Macos,
    /// Linux.
    Linux,
    /// Microsoft Windows.
    Windows,
}

impl Os {
    /// Map a Rust `target_os` name onto a formula tag.
    #[must_use]
    pub fn from_rust_os(os: &str) -> Option<Self> {
        match os {
            "macos" => Some(Self::Macos),
            "linux" => Some(Self::Linux),
            "windows" => Some(Self::Windows),
            _ => None,
        }
    }

    /// Return the formula spelling of this operating system.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Macos => "macos",
            Self::Linux => "linux",
            Self::Windows => "windows",
        }
    }
}

impl TryFrom<&str> for Os {
    type Error = ManifestError;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "macos" | "darwin" => Ok(Self::Macos),
            "linux" => Ok(Self::Linux),
            "windows" => Ok(Self::Windows),
            other => Err(ManifestError::UnsupportedPlatform {
                field: "os",
                value: other.to_owned(),
                expected: SUPPORTED_OSES.join(", "),
            }),
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The architecture and OS a formula is restricted to.
///
/// At least one half is always set; construction through
/// [`PlatformConstraint::new`] enforces that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PlatformConstraint {
    arch: Option<Arch>,
    os: Option<Os>,
}

impl PlatformConstraint {
    /// Build a constraint from optional arch and OS tags.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::EmptyPlatform`] when both are `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pour::manifest::platform::{Arch, PlatformConstraint};
    ///
    /// let arm_only = PlatformConstraint::new(Some(Arch::Arm64), None)
    ///     .expect("non-empty constraint");
    /// assert_eq!(arm_only.to_string(), "arch=arm64");
    /// ```
    pub fn new(arch: Option<Arch>, os: Option<Os>) -> Result<Self> {
        if arch.is_none() && os.is_none() {
            return Err(ManifestError::EmptyPlatform);
        }
        Ok(Self { arch, os })
    }

    /// Return the required architecture, if any.
    #[must_use]
    pub fn arch(&self) -> Option<Arch> {
        self.arch
    }

    /// Return the required operating system, if any.
    #[must_use]
    pub fn os(&self) -> Option<Os> {
        self.os
    }

    /// Whether `host` satisfies every half of this constraint.
    #[must_use]
    pub fn is_satisfied_by(&self, host: &HostPlatform) -> bool {
        let arch_ok = self.arch.is_none_or(|want| host.arch == Some(want));
        let os_ok = self.os.is_none_or(|want| host.os == Some(want));
        arch_ok && os_ok
    }
}

impl fmt::Display for PlatformConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.arch, self.os) {
            (Some(arch), Some(os)) => write!(f, "arch={arch}, os={os}"),
            (Some(arch), None) => write!(f, "arch={arch}"),
            (None, Some(os)) => write!(f, "os={os}"),
            (None, None) => f.write_str("any"),
        }
    }
}

/// The platform the installer is running on.
///
/// Hosts whose architecture or OS has no formula tag carry `None` for that
/// half and therefore fail any constraint that names it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlatform {
    arch: Option<Arch>,
    os: Option<Os>,
    raw: String,
}

impl HostPlatform {
    /// Detect the running host from `std::env::consts`.
    #[must_use]
    pub fn current() -> Self {
        Self::from_rust_names(std::env::consts::ARCH, std::env::consts::OS)
    }

    /// Build a host description from Rust `target_arch` / `target_os` names.
    ///
    /// # Examples
    ///
    /// ```
    /// use pour::manifest::platform::{Arch, HostPlatform, Os};
    ///
    /// let host = HostPlatform::from_rust_names("aarch64", "macos");
    /// assert_eq!(host.arch(), Some(Arch::Arm64));
    /// assert_eq!(host.os(), Some(Os::Macos));
    /// ```
    #[must_use]
    pub fn from_rust_names(arch: &str, os: &str) -> Self {
        Self {
            arch: Arch::from_rust_arch(arch),
            os: Os::from_rust_os(os),
            raw: format!("{arch}-{os}"),
        }
    }

    /// Return the host architecture tag, if it has one.
    #[must_use]
    pub fn arch(&self) -> Option<Arch> {
        self.arch
    }

    /// Return the host OS tag, if it has one.
    #[must_use]
    pub fn os(&self) -> Option<Os> {
        self.os
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
