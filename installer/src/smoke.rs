//! Post-install smoke test.
//!
//! Runs the manifest's test command against the freshly installed binary
//! and checks its combined output for the expected substring. The command
//! is executed directly, never through a shell.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::manifest::test_command::SmokeTest;

/// Default time the test command may run before it is killed.
pub const DEFAULT_SMOKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest output excerpt carried in a failure message.
const EXCERPT_LIMIT: usize = 400;

/// Errors arising from the smoke test.
#[derive(Debug, thiserror::Error)]
pub enum SmokeTestError {
    /// The installed program could not be started.
    #[error("failed to run {}: {source}", program.display())]
    Spawn {
        /// The program that was executed.
        program: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The program did not finish in time and was killed.
    #[error("`{command}` did not finish within {}s", timeout.as_secs())]
    TimedOut {
        /// The test command.
        command: String,
        /// The limit that expired.
        timeout: Duration,
    },

    /// The output did not contain the expected text.
    #[error("`{command}` output did not contain \"{expected}\" (got: {excerpt})")]
    MissingOutput {
        /// The test command.
        command: String,
        /// The expected substring.
        expected: String,
        /// A bounded excerpt of what was printed.
        excerpt: String,
    },
}

/// Outcome of running the test command.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the expected text was found.
    pub passed: bool,
    /// Stdout followed by stderr.
    pub output: String,
    /// Exit status; recorded for diagnostics only.
    pub status: ExitStatus,
}

/// Run `test` against the binaries in `bin_dir` and return the outcome.
///
/// A completed run is returned whether or not the text was found; use
/// [`validate`] to turn a miss into an error.
///
/// # Errors
///
/// Returns [`SmokeTestError::Spawn`] when the program cannot be started and
/// [`SmokeTestError::TimedOut`] when it outlives `timeout`.
pub fn run_smoke_test(
    bin_dir: &Path,
    test: &SmokeTest,
    timeout: Duration,
) -> Result<ValidationResult, SmokeTestError> {
    let program = bin_dir.join(test.program().as_str());
    log::debug!("running smoke test `{test}` via {}", program.display());

    let spawn_error = |source| SmokeTestError::Spawn {
        program: program.clone(),
        source,
    };
    let mut child = Command::new(&program)
        .args(test.args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_error)?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let Some(status) = child.wait_timeout(timeout).map_err(spawn_error)? else {
        kill(&mut child);
        return Err(SmokeTestError::TimedOut {
            command: test.to_string(),
            timeout,
        });
    };

    let mut output = join(stdout);
    output.push_str(&join(stderr));
    let passed = output.contains(test.expect());
    log::debug!("smoke test exited with {status}; expected text found: {passed}");

    Ok(ValidationResult {
        passed,
        output,
        status,
    })
}

/// Run the smoke test and fail unless the expected text was printed.
///
/// # Errors
///
/// Returns every [`run_smoke_test`] error plus
/// [`SmokeTestError::MissingOutput`] when the text is absent.
pub fn validate(
    bin_dir: &Path,
    test: &SmokeTest,
    timeout: Duration,
) -> Result<ValidationResult, SmokeTestError> {
    let result = run_smoke_test(bin_dir, test, timeout)?;
    if result.passed {
        return Ok(result);
    }
    Err(SmokeTestError::MissingOutput {
        command: test.to_string(),
        expected: test.expect().to_owned(),
        excerpt: excerpt(&result.output),
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut reader| {
        thread::spawn(move || {
            let mut bytes = Vec::new();
            // A read error leaves whatever was captured so far.
            let _ = reader.read_to_end(&mut bytes);
            String::from_utf8_lossy(&bytes).into_owned()
        })
    })
}

fn join(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

fn kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        log::warn!("failed to kill timed-out smoke test: {e}");
    }
    // Reap so no zombie is left behind; the status is irrelevant.
    let _ = child.wait();
}

fn excerpt(output: &str) -> String {
    let trimmed = output.trim();
    match trimmed.char_indices().nth(EXCERPT_LIMIT) {
        Some((cut, _)) => format!("{}…", trimmed.get(..cut).unwrap_or(trimmed)),
        None if trimmed.is_empty() => "<no output>".to_owned(),
        None => trimmed.to_owned(),
    }
}

#[cfg(test)]
#[path = "smoke_tests.rs"]
mod tests;
