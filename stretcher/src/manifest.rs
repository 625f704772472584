//! Deployment manifest schema and parsing.
//!
//! A manifest is a small YAML document:
//!
//! ```yaml
//! src: https://builds.example.com/app-1.4.2.tar
//! checksum: 0cc175b9c0f1b6a831c399e269772661
//! dest: /srv/app
//! commands:
//!   pre:
//!     - systemctl stop app
//!   post:
//!     - systemctl start app
//! ```
//!
//! Parsing only checks that `src` and `dest` are present. The checksum is
//! accepted verbatim; its length is checked when hashing starts.

use crate::checksum::DigestAlgorithm;
use crate::error::{DeployError, Result};
use crate::locator::SourceOpener;
use serde::Deserialize;
use std::io::Read;

/// Ordered hook command lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Commands {
    /// Commands run before the archive is extracted.
    pub pre: Vec<String>,
    /// Commands run after the destination has been synchronised.
    pub post: Vec<String>,
}

/// Wire form of the manifest; every field is optional until validated.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawManifest {
    src: Option<String>,
    checksum: Option<String>,
    dest: Option<String>,
    commands: Option<Commands>,
}

/// A validated deployment manifest.
///
/// Immutable once parsed; a deployment run borrows it for its whole
/// duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    src: String,
    checksum: String,
    dest: String,
    commands: Commands,
}

impl Manifest {
    /// Build a manifest from its parts, applying the same validation as
    /// [`parse_manifest`].
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Config`] if `src` or `dest` is empty.
    pub fn new(
        src: impl Into<String>,
        checksum: impl Into<String>,
        dest: impl Into<String>,
        commands: Commands,
    ) -> Result<Self> {
        let src = src.into();
        let dest = dest.into();
        if src.is_empty() {
            return Err(config_error("src is required"));
        }
        if dest.is_empty() {
            return Err(config_error("dest is required"));
        }
        Ok(Self {
            src,
            checksum: checksum.into(),
            dest,
            commands,
        })
    }

    /// The archive's source locator.
    #[must_use]
    pub fn src(&self) -> &str {
        &self.src
    }

    /// The declared hex checksum; empty when verification is disabled.
    #[must_use]
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// The destination directory.
    #[must_use]
    pub fn dest(&self) -> &str {
        &self.dest
    }

    /// Commands to run before extraction.
    #[must_use]
    pub fn pre_commands(&self) -> &[String] {
        &self.commands.pre
    }

    /// Commands to run after synchronisation.
    #[must_use]
    pub fn post_commands(&self) -> &[String] {
        &self.commands.post
    }

    /// Select the digest algorithm implied by the declared checksum.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::UnsupportedChecksum`] for a non-empty checksum
    /// of unsupported length.
    pub fn digest_algorithm(&self) -> Result<Option<DigestAlgorithm>> {
        DigestAlgorithm::for_checksum(&self.checksum)
    }
}

/// Parse raw manifest bytes into a validated [`Manifest`].
///
/// Unknown keys are ignored. Null values are treated as absent.
///
/// # Errors
///
/// Returns [`DeployError::Config`] if the document is not valid YAML, or if
/// `src` or `dest` is missing or empty.
///
/// # Examples
///
/// ```
/// use stretcher::manifest::parse_manifest;
///
/// let manifest = parse_manifest(b"src: file:///tmp/a.tar\ndest: /srv/app\n")?;
/// assert_eq!(manifest.src(), "file:///tmp/a.tar");
/// assert!(manifest.checksum().is_empty());
/// assert!(parse_manifest(b"dest: /srv/app\n").is_err());
/// # Ok::<(), stretcher::error::DeployError>(())
/// ```
pub fn parse_manifest(data: &[u8]) -> Result<Manifest> {
    let raw: RawManifest =
        serde_yaml_ng::from_slice(data).map_err(|e| config_error(e.to_string()))?;
    Manifest::new(
        raw.src.unwrap_or_default(),
        raw.checksum.unwrap_or_default(),
        raw.dest.unwrap_or_default(),
        raw.commands.unwrap_or_default(),
    )
}

/// Fetch the manifest named by `locator` through `opener` and parse it.
///
/// # Errors
///
/// Returns [`DeployError::Transfer`] if the manifest cannot be read, or the
/// errors of [`parse_manifest`].
pub fn load_manifest(opener: &dyn SourceOpener, locator: &str) -> Result<Manifest> {
    let mut reader = opener.open(locator)?;
    let mut data = Vec::new();
    reader
        .read_to_end(&mut data)
        .map_err(|e| DeployError::transfer(locator, e))?;
    parse_manifest(&data)
}

fn config_error(reason: impl Into<String>) -> DeployError {
    DeployError::Config {
        reason: reason.into(),
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
