//! Tests for the post-install smoke test.

use super::*;
use crate::manifest::install_action::{BinaryName, InstallAction};
use rstest::{fixture, rstest};
use tempfile::TempDir;

fn smoke_test(command: &str, expect: &str) -> SmokeTest {
    let program = command.split_whitespace().next().expect("command has a program");
    let actions = [InstallAction::PrimaryBinary {
        source: PathBuf::from(program),
        name: BinaryName::try_from(program).expect("valid name"),
    }];
    SmokeTest::new(command, expect, &actions).expect("valid smoke test")
}

#[test]
fn excerpt_is_bounded() {
    let long = "x".repeat(EXCERPT_LIMIT * 2);
    let cut = excerpt(&long);
    assert_eq!(cut.chars().count(), EXCERPT_LIMIT + 1);
    assert!(cut.ends_with('…'));
}

#[test]
fn excerpt_marks_silence() {
    assert_eq!(excerpt("  \n"), "<no output>");
}

#[test]
fn missing_program_fails_to_spawn() {
    let bin = tempfile::tempdir().expect("temp dir");
    let test = smoke_test("ghost --help", "ghost");
    let err = run_smoke_test(bin.path(), &test, DEFAULT_SMOKE_TIMEOUT)
        .expect_err("nothing installed");
    assert!(matches!(err, SmokeTestError::Spawn { .. }));
}

#[cfg(unix)]
mod unix {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    #[fixture]
    fn bin() -> TempDir {
        tempfile::tempdir().expect("temp dir")
    }

    fn install_script(bin: &Path, name: &str, body: &str) {
        let path = bin.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
    }

    #[rstest]
    fn passes_when_stdout_contains_text(bin: TempDir) {
        install_script(bin.path(), "tool", "echo \"Usage: tool $1\"");

        let result = validate(bin.path(), &smoke_test("tool --help", "tool"), DEFAULT_SMOKE_TIMEOUT)
            .expect("smoke test passes");
        assert!(result.passed);
        assert!(result.output.contains("Usage: tool --help"));
        assert!(result.status.success());
    }

    #[rstest]
    fn stderr_counts_and_exit_status_is_ignored(bin: TempDir) {
        install_script(bin.path(), "tool", "echo 'tool usage' >&2\nexit 2");

        let result = validate(bin.path(), &smoke_test("tool -h", "usage"), DEFAULT_SMOKE_TIMEOUT)
            .expect("text on stderr is enough");
        assert!(result.passed);
        assert_eq!(result.status.code(), Some(2));
    }

    #[rstest]
    fn missing_text_is_reported_with_excerpt(bin: TempDir) {
        install_script(bin.path(), "tool", "echo 'something else'");

        let err = validate(bin.path(), &smoke_test("tool --help", "Usage"), DEFAULT_SMOKE_TIMEOUT)
            .expect_err("text absent");
        match err {
            SmokeTestError::MissingOutput {
                expected, excerpt, ..
            } => {
                assert_eq!(expected, "Usage");
                assert_eq!(excerpt, "something else");
            }
            other => panic!("expected MissingOutput, got {other:?}"),
        }
    }

    #[rstest]
    fn run_smoke_test_reports_miss_without_error(bin: TempDir) {
        install_script(bin.path(), "tool", "echo nope");

        let result = run_smoke_test(bin.path(), &smoke_test("tool", "yes"), DEFAULT_SMOKE_TIMEOUT)
            .expect("completed run");
        assert!(!result.passed);
    }

    #[rstest]
    fn arguments_are_not_shell_expanded(bin: TempDir) {
        install_script(bin.path(), "tool", "echo \"arg=[$1]\"");

        let test = smoke_test("tool $HOME", "arg=");
        let result =
            run_smoke_test(bin.path(), &test, DEFAULT_SMOKE_TIMEOUT).expect("completed run");
        assert!(result.output.contains("arg=[$HOME]"), "{}", result.output);
    }

    #[rstest]
    fn slow_commands_time_out(bin: TempDir) {
        install_script(bin.path(), "tool", "exec sleep 10");

        let err = run_smoke_test(
            bin.path(),
            &smoke_test("tool", "never"),
            Duration::from_millis(200),
        )
        .expect_err("sleep outlives the limit");
        assert!(matches!(err, SmokeTestError::TimedOut { .. }));
    }
}
