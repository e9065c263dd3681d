//! CLI argument definitions for the `pour` installer.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Environment variable overriding the install prefix.
pub const PREFIX_ENV: &str = "POUR_PREFIX";

/// Environment variable overriding the download timeout in seconds.
pub const TIMEOUT_ENV: &str = "POUR_TIMEOUT_SECS";

/// Install a prebuilt binary from a formula manifest.
#[derive(Parser, Debug)]
#[command(name = "pour")]
#[command(version, about)]
#[command(long_about = concat!(
    "Install a prebuilt binary from a formula manifest.\n\n",
    "A formula names one release archive, its SHA-256 digest, what to place ",
    "under <prefix>/bin, and a command whose output proves the install works. ",
    "pour downloads the archive, refuses it unless the digest matches, unpacks ",
    "it, places the binaries and runs the check.",
))]
#[command(after_help = concat!(
    "EXIT CODES:\n",
    "  0    installed and validated\n",
    "  2    invalid manifest or arguments\n",
    "  3    formula does not support this platform\n",
    "  4    network failure or HTTP error status\n",
    "  5    checksum mismatch\n",
    "  6    unsupported, corrupt or unsafe archive\n",
    "  7    filesystem error or archive entry missing\n",
    "  8    installed, but the smoke test failed\n",
    "  130  cancelled\n\n",
    "EXAMPLES:\n",
    "  Install into ~/.local:\n",
    "    $ pour install stck.toml\n\n",
    "  Install into a custom prefix:\n",
    "    $ pour install stck.toml --prefix /opt/tools\n\n",
    "  Preview without downloading:\n",
    "    $ pour install stck.toml --dry-run\n\n",
    "  Check a mirrored archive offline:\n",
    "    $ pour verify stck.toml stck-v0.1.3.tar.gz",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Increase diagnostic log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        global = true,
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, global = true, conflicts_with = "verbosity")]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Download, verify, place and smoke-test a formula.
    Install(InstallArgs),

    /// Check a local archive against a formula's digest.
    Verify(VerifyArgs),
}

/// Arguments for the install command.
#[derive(Parser, Debug, Clone)]
pub struct InstallArgs {
    /// Path of the formula manifest (TOML).
    #[arg(value_name = "MANIFEST")]
    pub manifest: Utf8PathBuf,

    /// Install prefix; binaries go to <DIR>/bin [default: ~/.local].
    #[arg(short, long, value_name = "DIR", env = PREFIX_ENV)]
    pub prefix: Option<Utf8PathBuf>,

    /// Download timeout in seconds.
    #[arg(
        short,
        long,
        value_name = "SECS",
        env = TIMEOUT_ENV,
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,

    /// Smoke test timeout in seconds.
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub smoke_timeout: u64,

    /// Show the resolved plan and exit without downloading.
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the verify command.
#[derive(Parser, Debug, Clone)]
pub struct VerifyArgs {
    /// Path of the formula manifest (TOML).
    #[arg(value_name = "MANIFEST")]
    pub manifest: Utf8PathBuf,

    /// Path of the archive to check.
    #[arg(value_name = "ARCHIVE")]
    pub archive: Utf8PathBuf,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
