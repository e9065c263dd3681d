//! `pour` CLI entrypoint.
//!
//! Installs one prebuilt binary from a formula manifest, or checks a local
//! archive against a formula's digest. All human-facing output goes to
//! stderr; the exit code reports the failure category.

use std::io::Write;

use clap::Parser;
use log::LevelFilter;
use pour::artefact::download::HttpFetcher;
use pour::artefact::extraction::ArchiveExtractor;
use pour::cancel::CancelFlag;
use pour::cli::{Cli, Command, InstallArgs, VerifyArgs};
use pour::config::InstallerConfig;
use pour::dirs::{BaseDirs, SystemBaseDirs};
use pour::error::ErrorCategory;
use pour::manifest::manifest_parser::load_manifest;
use pour::output::{DryRunInfo, failure_lines, success_message, write_stderr_line};
use pour::pipeline::{Orchestrator, verify_archive};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbosity);
    let mut stderr = std::io::stderr();
    let exit_code = run(&cli, &SystemBaseDirs, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Route `log` output to stderr; `RUST_LOG` overrides the `-v` count.
fn init_logging(verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level_for_verbosity(verbosity))
        .format_timestamp(None)
        .parse_default_env();
    if builder.try_init().is_err() {
        // A logger is already installed; keep it.
    }
}

fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn run(cli: &Cli, dirs: &dyn BaseDirs, stderr: &mut dyn Write) -> i32 {
    match &cli.command {
        Command::Install(args) => run_install(args, cli.quiet, dirs, stderr),
        Command::Verify(args) => run_verify(args, stderr),
    }
}

fn run_install(
    args: &InstallArgs,
    quiet: bool,
    dirs: &dyn BaseDirs,
    stderr: &mut dyn Write,
) -> i32 {
    let config = match InstallerConfig::resolve(args, quiet, dirs) {
        Ok(config) => config,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            return ErrorCategory::Manifest.exit_code();
        }
    };

    if config.dry_run {
        return run_dry(&config, stderr);
    }

    let cancel = CancelFlag::from_ctrlc().unwrap_or_else(|err| {
        log::warn!("could not install Ctrl-C handler: {err}");
        CancelFlag::new()
    });
    let fetcher = HttpFetcher::new(config.fetch_timeout);
    let orchestrator = Orchestrator::new(&fetcher, &ArchiveExtractor, config.pipeline_options())
        .with_cancel_flag(cancel);

    match orchestrator.install_from_path(config.manifest.as_std_path(), stderr) {
        Ok(report) => {
            if !config.quiet {
                write_stderr_line(stderr, "");
                write_stderr_line(stderr, success_message(&report));
            }
            0
        }
        Err(failure) => {
            for line in failure_lines(&failure) {
                write_stderr_line(stderr, line);
            }
            failure.error.exit_code()
        }
    }
}

/// Print the resolved plan without touching the network or the prefix.
fn run_dry(config: &InstallerConfig, stderr: &mut dyn Write) -> i32 {
    let manifest = match load_manifest(config.manifest.as_std_path()) {
        Ok(manifest) => manifest,
        Err(err) => {
            write_stderr_line(stderr, format!("error: invalid manifest: {err}"));
            return ErrorCategory::Manifest.exit_code();
        }
    };
    let info = DryRunInfo {
        manifest: &manifest,
        prefix: &config.prefix,
        quiet: config.quiet,
    };
    write_stderr_line(stderr, info.display_text());
    0
}

fn run_verify(args: &VerifyArgs, stderr: &mut dyn Write) -> i32 {
    match verify_archive(args.manifest.as_std_path(), args.archive.as_std_path()) {
        Ok(digest) => {
            write_stderr_line(stderr, format!("{}: OK ({digest})", args.archive));
            0
        }
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            if let Some(hint) = err.category().hint() {
                write_stderr_line(stderr, format!("hint: {hint}"));
            }
            err.exit_code()
        }
    }
}
