//! Test support utilities shared by the integration and behaviour suites.
//!
//! Builds real tar archives with the `tar` crate so that deployments can be
//! exercised against the host's `tar` and `rsync` tools.

use std::fs::File;
use std::path::Path;
use std::process::Command;
use stretcher::checksum::DigestAlgorithm;

/// Files packed into every test archive.
pub const ARCHIVE_FILES: &[(&str, &[u8])] = &[
    ("VERSION", b"1.4.2\n"),
    ("bin/app", b"#!/bin/sh\necho app\n"),
    ("config/app.yml", b"listen: 0.0.0.0:8080\n"),
];

/// Write a tar archive containing `files` to `path`.
pub fn build_archive(path: &Path, files: &[(&str, &[u8])]) {
    let file = File::create(path).expect("failed to create archive");
    let mut builder = tar::Builder::new(file);
    for (name, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, name, *contents)
            .expect("failed to append archive entry");
    }
    builder
        .into_inner()
        .expect("failed to finish archive")
        .sync_all()
        .expect("failed to flush archive");
}

/// Hex digest of the file at `path`.
pub fn file_digest(path: &Path, algorithm: DigestAlgorithm) -> String {
    let data = std::fs::read(path).expect("failed to read file");
    let mut hasher = algorithm.hasher();
    hasher.update(&data);
    hasher.finalize_hex()
}

/// Whether `tool` can be launched on this host.
pub fn tool_available(tool: &str) -> bool {
    Command::new(tool)
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

/// Names of the entries directly inside `root`.
pub fn staged_entries(root: &Path) -> Vec<String> {
    std::fs::read_dir(root)
        .expect("failed to read staging root")
        .flatten()
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect()
}
