//! Shared test utilities for the installer crate.
//!
//! Builds fixture archives in each supported format and formula manifests
//! pointing at them, so unit and behaviour tests exercise the real pipeline
//! without network access.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use sha2::{Digest, Sha256};

use crate::manifest::PackageManifest;
use crate::manifest::manifest_parser::parse_manifest;

/// Executable mode applied to fixture binaries.
pub const EXECUTABLE_MODE: u32 = 0o755;

/// A file to place inside a fixture archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Path of the entry inside the archive.
    pub path: String,
    /// File contents.
    pub contents: Vec<u8>,
    /// Unix permission bits.
    pub mode: u32,
    /// Target of a symlink entry; `None` for regular files.
    pub link_target: Option<String>,
}

impl ArchiveEntry {
    /// An executable entry.
    pub fn executable(path: &str, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.to_owned(),
            contents: contents.into(),
            mode: EXECUTABLE_MODE,
            link_target: None,
        }
    }

    /// A plain, non-executable entry.
    pub fn file(path: &str, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.to_owned(),
            contents: contents.into(),
            mode: 0o644,
            link_target: None,
        }
    }

    /// A symlink entry at `path` pointing at `target`.
    pub fn symlink(path: &str, target: &str) -> Self {
        Self {
            path: path.to_owned(),
            contents: Vec::new(),
            mode: 0o777,
            link_target: Some(target.to_owned()),
        }
    }
}

/// Convert a scratch path into a UTF-8 path.
///
/// # Panics
///
/// Panics if `path` is not valid UTF-8; temporary directories on the hosts
/// the suites run on always are.
pub fn utf8_path(path: &Path) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).expect("scratch path is UTF-8")
}

/// Compute the lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Compute the lowercase hex SHA-256 of the file at `path`.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    Ok(sha256_hex(&fs::read(path)?))
}

/// A `sh` script that prints a usage banner mentioning `name`.
///
/// Stands in for a real release binary in smoke tests on Unix hosts.
pub fn usage_script(name: &str) -> String {
    format!("#!/bin/sh\necho \"Usage: {name} [OPTIONS] <PATH>\"\necho \"{name} checks your files\"\n")
}

fn tar_header(entry: &ArchiveEntry) -> tar::Header {
    let mut header = tar::Header::new_gnu();
    header.set_size(entry.contents.len() as u64);
    header.set_mode(entry.mode);
    let kind = if entry.link_target.is_some() {
        tar::EntryType::Symlink
    } else {
        tar::EntryType::Regular
    };
    header.set_entry_type(kind);
    header.set_mtime(0);
    header
}

fn append_entries<W: Write>(
    builder: &mut tar::Builder<W>,
    entries: &[ArchiveEntry],
) -> io::Result<()> {
    for entry in entries {
        let mut header = tar_header(entry);
        match &entry.link_target {
            Some(target) => builder.append_link(&mut header, &entry.path, target)?,
            None => builder.append_data(&mut header, &entry.path, entry.contents.as_slice())?,
        }
    }
    Ok(())
}

/// Write a `.tar.gz` archive containing `entries` to `path`.
pub fn write_tar_gz(path: &Path, entries: &[ArchiveEntry]) -> io::Result<()> {
    let file = fs::File::create(path)?;
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    append_entries(&mut builder, entries)?;
    let encoder = builder.into_inner()?;
    encoder.finish()?;
    Ok(())
}

/// Write a `.tar.zst` archive containing `entries` to `path`.
pub fn write_tar_zst(path: &Path, entries: &[ArchiveEntry]) -> io::Result<()> {
    let file = fs::File::create(path)?;
    let encoder = zstd::Encoder::new(file, 0)?;
    let mut builder = tar::Builder::new(encoder);
    append_entries(&mut builder, entries)?;
    let encoder = builder.into_inner()?;
    encoder.finish()?;
    Ok(())
}

/// Write a `.zip` archive containing `entries` to `path`.
pub fn write_zip(path: &Path, entries: &[ArchiveEntry]) -> io::Result<()> {
    let file = fs::File::create(path)?;
    let mut writer = zip::ZipWriter::new(file);
    for entry in entries {
        let options = zip::write::SimpleFileOptions::default().unix_permissions(entry.mode);
        if let Some(target) = &entry.link_target {
            writer
                .add_symlink(entry.path.as_str(), target.as_str(), options)
                .map_err(io::Error::other)?;
            continue;
        }
        writer.start_file(entry.path.as_str(), options).map_err(io::Error::other)?;
        writer.write_all(&entry.contents)?;
    }
    writer.finish().map_err(io::Error::other)?;
    Ok(())
}

/// Write a `.tar.gz` whose single entry name escapes the extraction root.
///
/// `tar::Builder` refuses such names, so the header bytes are set directly.
pub fn write_traversal_tar_gz(path: &Path, escaping_name: &str) -> io::Result<()> {
    let file = fs::File::create(path)?;
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let contents = b"escaped";
    let mut header = tar::Header::new_old();
    {
        let name = &mut header.as_old_mut().name;
        let bytes = escaping_name.as_bytes();
        name[..bytes.len()].copy_from_slice(bytes);
    }
    header.set_size(contents.len() as u64);
    header.set_mode(0o644);
    header.set_entry_type(tar::EntryType::Regular);
    header.set_cksum();
    builder.append(&header, contents.as_slice())?;
    let encoder = builder.into_inner()?;
    encoder.finish()?;
    Ok(())
}

/// Render a formula manifest for `name` pointing at the `url` template.
///
/// `url` must carry the `{version}` placeholder; the fixture version is
/// `1.2.3`. The formula installs `<name>` as the primary binary and `<name>-alias`
/// as a symlink alias, and smoke-tests `<name> --help` for `<name>`.
pub fn formula_toml(name: &str, url: &str, sha256: &str) -> String {
    format!(
        r#"name = "{name}"
description = "Fixture formula"
homepage = "https://example.test/{name}"
version = "1.2.3"
url = "{url}"
sha256 = "{sha256}"

[[install]]
role = "primary-binary"
source = "{name}"

[[install]]
role = "symlink-alias"
alias = "{name}-alias"

[test]
command = "{name} --help"
expect = "{name}"
"#
    )
}

/// Parse [`formula_toml`] into a manifest.
///
/// # Panics
///
/// Panics if the rendered formula fails validation; fixtures are expected
/// to be well formed.
pub fn formula_manifest(name: &str, url: &str, sha256: &str) -> PackageManifest {
    parse_manifest(&formula_toml(name, url, sha256)).expect("fixture formula parses")
}

/// A `file://` URL for `path`.
pub fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// An archive and manifest pair written into a scratch directory.
#[derive(Debug)]
pub struct FormulaFixture {
    /// Path of the archive on disk.
    pub archive: PathBuf,
    /// Hex digest of the archive.
    pub sha256: String,
    /// Manifest pointing at the archive by `file://` URL.
    pub manifest: PackageManifest,
    /// Path of the manifest written as TOML.
    pub manifest_path: PathBuf,
}

/// Build a `.tar.gz` formula fixture for `name` inside `dir`.
///
/// The archive wraps the binary in a `<name>-v1.2.3/` directory the way
/// release tarballs commonly do.
///
/// # Panics
///
/// Panics if the scratch directory cannot be written.
pub fn formula_fixture(dir: &Path, name: &str) -> FormulaFixture {
    let entries = [ArchiveEntry::executable(
        &format!("{name}-v1.2.3/{name}"),
        usage_script(name),
    )];
    let url = format!("file://{}/{name}-v{{version}}.tar.gz", dir.display());
    write_fixture(dir, name, &format!("{name}-v1.2.3.tar.gz"), &entries, |sha256| {
        formula_toml(name, &url, sha256)
    })
}

/// Render the `stck` formula against the `url` template.
///
/// Version `0.1.0`; installs `stck` with a `git-stck` alias and smoke-tests
/// `stck --help` for `stck`.
pub fn stck_formula_toml(url: &str, sha256: &str) -> String {
    format!(
        r#"name = "stck"
description = "Stacked pull requests for git"
homepage = "https://example.test/stck"
version = "0.1.0"
url = "{url}"
sha256 = "{sha256}"

[[install]]
role = "primary-binary"
source = "stck"

[[install]]
role = "symlink-alias"
alias = "git-stck"

[test]
command = "stck --help"
expect = "stck"
"#
    )
}

/// Build the `stck` fixture inside `dir`, served as `pkg-v0.1.0.tar.gz`.
///
/// # Panics
///
/// Panics if the scratch directory cannot be written.
pub fn stck_fixture(dir: &Path) -> FormulaFixture {
    let entries = [ArchiveEntry::executable(
        "pkg-v0.1.0/stck",
        usage_script("stck"),
    )];
    let url = format!("file://{}/pkg-v{{version}}.tar.gz", dir.display());
    write_fixture(dir, "stck", "pkg-v0.1.0.tar.gz", &entries, |sha256| {
        stck_formula_toml(&url, sha256)
    })
}

fn write_fixture(
    dir: &Path,
    name: &str,
    archive_name: &str,
    entries: &[ArchiveEntry],
    render: impl FnOnce(&str) -> String,
) -> FormulaFixture {
    let archive = dir.join(archive_name);
    write_tar_gz(&archive, entries).expect("write fixture archive");
    let sha256 = sha256_file(&archive).expect("hash fixture archive");
    let toml = render(&sha256);
    let manifest_path = dir.join(format!("{name}.toml"));
    fs::write(&manifest_path, &toml).expect("write fixture manifest");
    let manifest = parse_manifest(&toml).expect("fixture formula parses");
    FormulaFixture {
        archive,
        sha256,
        manifest,
        manifest_path,
    }
}
