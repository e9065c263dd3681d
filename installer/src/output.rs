//! Output formatting for the installer CLI.
//!
//! Progress, success and failure messages go to stderr so that stdout stays
//! free for machine-readable use. This module holds the text; the binary
//! decides when to print it.

use std::fmt;
use std::io::Write;

use camino::Utf8Path;

use crate::error::InstallError;
use crate::manifest::PackageManifest;
use crate::manifest::install_action::InstallAction;
use crate::pipeline::{InstallReport, PipelineFailure};

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; nothing useful to do on failure.
    }
}

/// Format a success message after installation.
///
/// # Example
///
/// ```
/// use pour::output::install_summary;
///
/// let text = install_summary("stck", "0.1.3", &["stck", "git-stck"], "/opt/bin");
/// assert!(text.starts_with("Installed stck 0.1.3"));
/// assert!(text.contains("git-stck"));
/// ```
#[must_use]
pub fn install_summary(package: &str, version: &str, names: &[&str], bin_dir: &str) -> String {
    let plural = if names.len() == 1 { "file" } else { "files" };
    let mut lines = vec![format!(
        "Installed {package} {version} ({} {plural}) to {bin_dir}",
        names.len()
    )];
    lines.extend(names.iter().map(|name| format!("  - {name}")));
    lines.join("\n")
}

/// Format the success message for a finished run.
#[must_use]
pub fn success_message(report: &InstallReport) -> String {
    let names: Vec<&str> = report
        .layout
        .entries()
        .iter()
        .map(|entry| entry.name.as_str())
        .collect();
    install_summary(
        &report.package,
        &report.version,
        &names,
        report.layout.bin_dir().as_str(),
    )
}

/// Format the lines reported for a failed run.
#[must_use]
pub fn failure_lines(failure: &PipelineFailure) -> Vec<String> {
    let category = failure.error.category();
    let mut lines = vec![format!("error: {}", failure.error)];
    if let Some(hint) = category.hint() {
        lines.push(format!("hint: {hint}"));
    }

    if failure.left_partial_install() {
        lines.push(format!(
            "warning: the run stopped while {} and left a partial install:",
            failure.failed_in
        ));
        lines.extend(failure.placed.iter().map(|path| format!("  - {path}")));
        lines.push("warning: re-run the install to complete it".to_owned());
    } else if matches!(failure.error, InstallError::SmokeTest(_)) {
        lines.push("note: the files below are installed but did not pass the check:".to_owned());
        lines.extend(failure.placed.iter().map(|path| format!("  - {path}")));
    }
    lines
}

/// Configuration information for dry-run output.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use pour::manifest::manifest_parser::parse_manifest;
/// use pour::output::DryRunInfo;
///
/// let manifest = parse_manifest(r#"
/// name = "stck"
/// description = "Stacked PR helper"
/// homepage = "https://github.com/example/stck"
/// version = "0.1.3"
/// url = "https://example.test/stck-{version}.tar.gz"
/// sha256 = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
///
/// [[install]]
/// role = "primary-binary"
/// source = "stck"
///
/// [test]
/// command = "stck --help"
/// expect = "stck"
/// "#).expect("valid manifest");
///
/// let info = DryRunInfo {
///     manifest: &manifest,
///     prefix: Utf8Path::new("/opt/tools"),
///     quiet: false,
/// };
///
/// let output = info.display_text();
/// assert!(output.contains("Dry run"));
/// assert!(output.contains("https://example.test/stck-0.1.3.tar.gz"));
/// ```
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// The formula to be installed.
    pub manifest: &'a PackageManifest,
    /// Install prefix.
    pub prefix: &'a Utf8Path,
    /// Whether quiet mode is enabled.
    pub quiet: bool,
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let manifest = self.manifest;
        let bin_dir = self.prefix.join("bin");
        let mut lines = vec![
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Package: {} {}", manifest.name(), manifest.version()),
            format!("Description: {}", manifest.description()),
            format!("Homepage: {}", manifest.homepage()),
            format!("URL template: {}", manifest.url_template()),
            format!("Download: {}", manifest.resolved_url()),
            format!("SHA-256: {}", manifest.sha256()),
            format!("Prefix: {}", self.prefix),
            format!("Quiet: {}", self.quiet),
        ];
        if let Some(platform) = manifest.platform() {
            lines.push(format!("Platform: {platform}"));
        }

        lines.push(String::new());
        lines.push("Planned layout:".to_owned());
        for action in manifest.install_actions() {
            let line = match action {
                InstallAction::PrimaryBinary { source, name } => {
                    format!("  - {bin_dir}/{name} (from {})", source.display())
                }
                InstallAction::SymlinkAlias { alias, target } => {
                    format!("  - {bin_dir}/{alias} -> {target}")
                }
            };
            lines.push(line);
        }
        lines.push(String::new());
        lines.push(format!("Smoke test: {}", manifest.smoke_test()));

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artefact::download::FetchError;
    use crate::pipeline::InstallState;
    use crate::smoke::SmokeTestError;
    use crate::test_utils::{formula_manifest, sha256_hex};
    use rstest::{fixture, rstest};
    use camino::Utf8PathBuf;

    #[fixture]
    fn manifest() -> PackageManifest {
        formula_manifest(
            "tool",
            "https://example.test/v{version}/tool.tar.gz",
            &sha256_hex(b"tool"),
        )
    }

    #[rstest]
    #[case::singular(&["tool"], "(1 file)")]
    #[case::plural(&["tool", "tool-alias"], "(2 files)")]
    fn install_summary_pluralises_correctly(#[case] names: &[&str], #[case] expected: &str) {
        let msg = install_summary("tool", "1.2.3", names, "/tmp/bin");
        assert!(msg.contains(expected), "{msg}");
    }

    #[rstest]
    fn dry_run_lists_planned_layout(manifest: PackageManifest) {
        let info = DryRunInfo {
            manifest: &manifest,
            prefix: Utf8Path::new("/opt/tools"),
            quiet: true,
        };
        let text = info.display_text();

        assert!(text.contains("Description: Fixture formula"));
        assert!(text.contains("Homepage: https://example.test/tool"));
        assert!(text.contains("URL template: https://example.test/v{version}/tool.tar.gz"));
        assert!(text.contains("Download: https://example.test/v1.2.3/tool.tar.gz"));
        assert!(text.contains("/opt/tools/bin/tool (from tool)"));
        assert!(text.contains("/opt/tools/bin/tool-alias -> tool"));
        assert!(text.contains("Smoke test: tool --help"));
    }

    #[test]
    fn failure_before_placement_has_no_warning() {
        let failure = PipelineFailure {
            failed_in: InstallState::Fetching,
            error: InstallError::Fetch(FetchError::HttpStatus {
                url: "https://h.test/a".to_owned(),
                status: 404,
            }),
            placed: Vec::new(),
        };
        let lines = failure_lines(&failure);

        assert!(lines[0].starts_with("error: server returned HTTP 404"));
        assert!(lines.iter().all(|line| !line.starts_with("warning")));
    }

    #[test]
    fn partial_install_is_called_out() {
        let failure = PipelineFailure {
            failed_in: InstallState::Installing,
            error: InstallError::Cancelled,
            placed: vec![Utf8PathBuf::from("/opt/tools/bin/tool")],
        };
        let lines = failure_lines(&failure);

        assert!(lines.iter().any(|line| line.contains("partial install")));
        assert!(lines.iter().any(|line| line.contains("/opt/tools/bin/tool")));
    }

    #[test]
    fn smoke_failure_says_files_are_installed() {
        let failure = PipelineFailure {
            failed_in: InstallState::Validating,
            error: InstallError::SmokeTest(SmokeTestError::MissingOutput {
                command: "tool --help".to_owned(),
                expected: "tool".to_owned(),
                excerpt: "<no output>".to_owned(),
            }),
            placed: vec![Utf8PathBuf::from("/opt/tools/bin/tool")],
        };
        let lines = failure_lines(&failure);

        assert!(lines[0].contains("installed, but the smoke test failed"));
        assert!(lines.iter().any(|line| line.starts_with("note:")));
        assert!(lines.iter().all(|line| !line.contains("partial install")));
    }

    #[test]
    fn write_stderr_line_appends_newline() {
        let mut buffer = Vec::new();
        write_stderr_line(&mut buffer, "hello");
        assert_eq!(buffer, b"hello\n");
    }
}
