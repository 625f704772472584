//! Stretcher deployment library.
//!
//! This crate fetches a release archive, verifies its checksum while it is
//! being written to disk, runs pre-deploy commands, unpacks the archive with
//! `tar`, mirrors it onto the destination with `rsync`, and finally runs
//! post-deploy commands. It backs the `stretcher` CLI binary and can be
//! driven programmatically with substitute collaborators for testing.
//!
//! # Modules
//!
//! - [`checksum`] - Digest algorithm selection and checksum comparison
//! - [`cli`] - Command-line argument definitions
//! - [`command`] - External process execution seam
//! - [`copier`] - Single-pass copy and hash of the archive stream
//! - [`deploy`] - Pipeline orchestration and dry-run planning
//! - [`error`] - Deployment error and stage types
//! - [`extract`] - Archive extraction via `tar`
//! - [`hooks`] - Pre- and post-deploy shell commands
//! - [`locator`] - Opening local paths and HTTP(S) URLs as byte streams
//! - [`manifest`] - Manifest schema and YAML parsing
//! - [`output`] - Logging setup and user-facing output helpers
//! - [`sync`] - Mirror synchronisation via `rsync`

pub mod checksum;
pub mod cli;
pub mod command;
pub mod copier;
pub mod deploy;
pub mod error;
pub mod extract;
pub mod hooks;
pub mod locator;
pub mod manifest;
pub mod output;
pub mod sync;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
