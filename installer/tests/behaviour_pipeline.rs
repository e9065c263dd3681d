//! Behaviour-driven tests for the install pipeline.
//!
//! Formulas point at `file://` archives written into a scratch directory, so
//! the real fetcher, extractor and smoke test run without network access.
//! The installed fixtures are `sh` scripts, hence Unix only.
#![cfg(unix)]

mod support;

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use pour::artefact::download::HttpFetcher;
use pour::artefact::extraction::ArchiveExtractor;
use pour::manifest::PackageManifest;
use pour::manifest::manifest_parser::parse_manifest;
use pour::manifest::platform::HostPlatform;
use pour::pipeline::{InstallReport, Orchestrator, PipelineFailure};
use pour::receipt::receipt_path;
use pour::test_utils::{
    ArchiveEntry, formula_toml, sha256_hex, stck_fixture, usage_script, write_tar_gz,
    write_traversal_tar_gz,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use support::Scene;

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

struct PipelineWorld {
    scene: Scene,
    archive: Option<PathBuf>,
    manifest: Option<PackageManifest>,
    host: Option<HostPlatform>,
    outcome: Option<Result<InstallReport, PipelineFailure>>,
}

#[fixture]
fn world() -> PipelineWorld {
    PipelineWorld {
        scene: Scene::new(),
        archive: None,
        manifest: None,
        host: None,
        outcome: None,
    }
}

impl PipelineWorld {
    fn package_with(&mut self, name: &str, entries: &[ArchiveEntry]) {
        let archive = self.scene.archive_path(name);
        write_tar_gz(&archive, entries).expect("write archive");
        self.manifest = Some(self.scene.manifest_for(name, &archive));
        self.archive = Some(archive);
    }

    fn report(&self) -> &InstallReport {
        match self.outcome.as_ref().expect("install was run") {
            Ok(report) => report,
            Err(failure) => panic!("install failed: {failure}"),
        }
    }

    fn failure(&self) -> &PipelineFailure {
        match self.outcome.as_ref().expect("install was run") {
            Ok(report) => panic!("expected failure, got report for {}", report.package),
            Err(failure) => failure,
        }
    }

    fn installed(&self, name: &str) -> PathBuf {
        self.scene.bin_dir().join(name)
    }
}

// ---------------------------------------------------------------------------
// Step definitions
// ---------------------------------------------------------------------------

#[given("a formula \"{name}\" served from a local archive")]
fn given_local_formula(world: &mut PipelineWorld, name: String) {
    let entries = [ArchiveEntry::executable(
        &format!("{name}-v1.2.3/{name}"),
        usage_script(&name),
    )];
    world.package_with(&name, &entries);
}

#[given("the stck 0.1.0 formula served from a local archive")]
fn given_stck_formula(world: &mut PipelineWorld) {
    let fixture = stck_fixture(&world.scene.fixtures);
    world.manifest = Some(fixture.manifest);
    world.archive = Some(fixture.archive);
}

#[given("the archive has been replaced with other bytes")]
fn given_archive_replaced(world: &mut PipelineWorld) {
    let archive = world.archive.as_ref().expect("archive written");
    fs::write(archive, b"definitely not the release").expect("overwrite archive");
}

#[given("a formula \"{name}\" restricted to os \"{os}\"")]
fn given_restricted_formula(world: &mut PipelineWorld, name: String, os: String) {
    let url = world.scene.url_template(&name);
    let toml = format!(
        "{}\n[platform]\nos = \"{os}\"\n",
        formula_toml(&name, &url, &sha256_hex(b"unused"))
    );
    world.manifest = Some(parse_manifest(&toml).expect("valid manifest"));
}

#[given("the host is \"{arch}\" \"{os}\"")]
fn given_host(world: &mut PipelineWorld, arch: String, os: String) {
    world.host = Some(HostPlatform::from_rust_names(&arch, &os));
}

#[given("a formula \"{name}\" whose archive contains the entry \"{entry}\"")]
fn given_escaping_archive(world: &mut PipelineWorld, name: String, entry: String) {
    let archive = world.scene.archive_path(&name);
    write_traversal_tar_gz(&archive, &entry).expect("write archive");
    world.manifest = Some(world.scene.manifest_for(&name, &archive));
    world.archive = Some(archive);
}

#[given("a formula \"{name}\" whose binary prints \"{text}\"")]
fn given_quiet_binary(world: &mut PipelineWorld, name: String, text: String) {
    let script = format!("#!/bin/sh\necho \"{text}\"\n");
    let entries = [ArchiveEntry::executable(
        &format!("{name}-v1.2.3/{name}"),
        script,
    )];
    world.package_with(&name, &entries);
}

#[when("the formula is installed")]
fn when_installed(world: &mut PipelineWorld) {
    let manifest = world.manifest.as_ref().expect("manifest prepared");
    let fetcher = HttpFetcher::default();
    let mut orchestrator = Orchestrator::new(&fetcher, &ArchiveExtractor, world.scene.options());
    if let Some(host) = world.host.clone() {
        orchestrator = orchestrator.with_host(host);
    }
    world.outcome = Some(orchestrator.install(manifest, &mut io::sink()));
}

#[then("the install succeeds")]
fn then_install_succeeds(world: &mut PipelineWorld) {
    match world.outcome.as_ref().expect("install was run") {
        Ok(report) => assert!(report.validation.passed),
        Err(failure) => panic!("install failed: {failure}"),
    }
    let leftovers = fs::read_dir(&world.scene.scratch)
        .expect("read scratch")
        .count();
    assert_eq!(leftovers, 0, "temporary directories were left behind");
}

#[then("\"{name}\" is installed as an executable")]
fn then_installed_executable(world: &mut PipelineWorld, name: String) {
    let path = world.installed(&name);
    let mode = fs::metadata(&path)
        .expect("installed file exists")
        .permissions()
        .mode();
    assert_eq!(mode & 0o111, 0o111, "{} is not executable", path.display());
}

#[then("\"{alias}\" points at \"{target}\"")]
fn then_alias_points_at(world: &mut PipelineWorld, alias: String, target: String) {
    let link = fs::read_link(world.installed(&alias)).expect("alias is a symlink");
    assert_eq!(link, Path::new(&target));
}

#[then("\"{alias}\" resolves to \"{target}\"")]
fn then_alias_resolves_to(world: &mut PipelineWorld, alias: String, target: String) {
    let link = world.installed(&alias);
    let meta = fs::symlink_metadata(&link).expect("alias installed");
    assert!(meta.file_type().is_symlink(), "{} is not a symlink", link.display());
    assert_eq!(
        fs::canonicalize(&link).expect("alias resolves"),
        fs::canonicalize(world.installed(&target)).expect("target resolves")
    );
}

#[then("the smoke test output mentions \"{text}\"")]
fn then_smoke_output_mentions(world: &mut PipelineWorld, text: String) {
    let output = &world.report().validation.output;
    assert!(output.contains(&text), "missing {text:?} in {output:?}");
}

#[then("the receipt records version \"{version}\"")]
fn then_receipt_version(world: &mut PipelineWorld, version: String) {
    let report = world.report();
    let path = report.receipt.as_ref().expect("receipt written");
    let text = fs::read_to_string(path).expect("read receipt");
    let receipt: serde_json::Value = serde_json::from_str(&text).expect("receipt is JSON");
    assert_eq!(receipt["name"], report.package.as_str());
    assert_eq!(receipt["version"], version.as_str());
}

#[then("an install receipt is recorded for \"{name}\"")]
fn then_receipt_recorded(world: &mut PipelineWorld, name: String) {
    let path = receipt_path(&world.scene.prefix, &name);
    let text = fs::read_to_string(&path).expect("receipt written");
    let receipt: serde_json::Value = serde_json::from_str(&text).expect("receipt is JSON");
    assert_eq!(receipt["name"], name.as_str());
    assert_eq!(receipt["version"], "1.2.3");
}

#[then("the install fails while \"{state}\"")]
fn then_fails_while(world: &mut PipelineWorld, state: String) {
    assert_eq!(world.failure().failed_in.to_string(), state);
}

#[then("the exit code is {code}")]
fn then_exit_code(world: &mut PipelineWorld, code: i32) {
    assert_eq!(world.failure().error.exit_code(), code);
}

#[then("nothing is installed")]
fn then_nothing_installed(world: &mut PipelineWorld) {
    assert!(world.scene.nothing_installed());
}

// ---------------------------------------------------------------------------
// Scenario bindings
// ---------------------------------------------------------------------------

#[scenario(
    path = "tests/features/install_pipeline.feature",
    name = "Install a formula from a local archive"
)]
fn scenario_install_from_local_archive(world: PipelineWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/install_pipeline.feature",
    name = "Install stck 0.1.0 with its git-stck alias"
)]
fn scenario_install_stck_with_alias(world: PipelineWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/install_pipeline.feature",
    name = "Reject a tampered archive"
)]
fn scenario_reject_tampered_archive(world: PipelineWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/install_pipeline.feature",
    name = "Refuse a formula built for another platform"
)]
fn scenario_refuse_other_platform(world: PipelineWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/install_pipeline.feature",
    name = "Refuse an archive entry that escapes the staging directory"
)]
fn scenario_refuse_escaping_entry(world: PipelineWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/install_pipeline.feature",
    name = "Keep the install when the smoke test fails"
)]
fn scenario_keep_install_after_smoke_failure(world: PipelineWorld) {
    let _ = world;
}
