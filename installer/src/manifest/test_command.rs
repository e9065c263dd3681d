//! Post-install smoke test declaration.
//!
//! The formula states a command line and a substring its output must
//! contain. The first word of the command names an installed binary (a
//! primary or an alias); the rest are passed as arguments verbatim. No shell
//! is involved.

use super::error::{ManifestError, Result};
use super::install_action::{BinaryName, InstallAction};
use serde::Serialize;
use std::fmt;

/// A validated smoke test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmokeTest {
    program: BinaryName,
    args: Vec<String>,
    expect: String,
}

impl SmokeTest {
    /// Parse `command` and check it runs something the actions install.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidTest`] when the command or expected
    /// substring is empty, or when the program is not installed by
    /// `actions`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pour::manifest::install_action::{validate_actions, RawInstallAction};
    /// use pour::manifest::test_command::SmokeTest;
    ///
    /// let actions = validate_actions(vec![RawInstallAction::PrimaryBinary {
    ///     source: "stck".to_owned(),
    ///     name: None,
    /// }])
    /// .expect("valid actions");
    /// let test = SmokeTest::new("stck --help", "stck", &actions).expect("valid test");
    /// assert_eq!(test.program().as_str(), "stck");
    /// assert_eq!(test.args(), ["--help"]);
    /// ```
    pub fn new(command: &str, expect: &str, actions: &[InstallAction]) -> Result<Self> {
        let mut words = command.split_whitespace();
        let program = words.next().ok_or_else(|| ManifestError::InvalidTest {
            reason: "command must not be empty".to_owned(),
        })?;
        if expect.is_empty() {
            return Err(ManifestError::InvalidTest {
                reason: "expected output substring must not be empty".to_owned(),
            });
        }

        let program = actions
            .iter()
            .map(InstallAction::installed_name)
            .find(|name| name.as_str() == program)
            .cloned()
            .ok_or_else(|| ManifestError::InvalidTest {
                reason: format!("\"{program}\" is not installed by any install action"),
            })?;

        Ok(Self {
            program,
            args: words.map(str::to_owned).collect(),
            expect: expect.to_owned(),
        })
    }

    /// Return the installed binary the test invokes.
    #[must_use]
    pub fn program(&self) -> &BinaryName {
        &self.program
    }

    /// Return the arguments passed to the program.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Return the substring the combined output must contain.
    #[must_use]
    pub fn expect(&self) -> &str {
        &self.expect
    }
}

impl fmt::Display for SmokeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::install_action::{RawInstallAction, validate_actions};

    fn stck_actions() -> Vec<InstallAction> {
        validate_actions(vec![
            RawInstallAction::PrimaryBinary {
                source: "stck".to_owned(),
                name: None,
            },
            RawInstallAction::SymlinkAlias {
                alias: "git-stck".to_owned(),
                target: None,
            },
        ])
        .expect("valid actions")
    }

    #[test]
    fn accepts_alias_as_program() {
        let test = SmokeTest::new("git-stck --version", "stck", &stck_actions()).expect("valid");
        assert_eq!(test.program().as_str(), "git-stck");
        assert_eq!(test.to_string(), "git-stck --version");
    }

    #[test]
    fn rejects_unknown_program() {
        let err = SmokeTest::new("other --help", "stck", &stck_actions()).expect_err("invalid");
        assert!(matches!(err, ManifestError::InvalidTest { .. }));
    }

    #[test]
    fn rejects_blank_command() {
        let err = SmokeTest::new("   ", "stck", &stck_actions()).expect_err("invalid");
        assert!(matches!(err, ManifestError::InvalidTest { .. }));
    }

    #[test]
    fn rejects_empty_expectation() {
        let err = SmokeTest::new("stck --help", "", &stck_actions()).expect_err("invalid");
        assert!(matches!(err, ManifestError::InvalidTest { .. }));
    }
}
