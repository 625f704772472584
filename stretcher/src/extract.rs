//! Archive extraction.
//!
//! Unpacking is delegated to the system `tar`. The tool runs with its working
//! directory set to the staging directory, so the deployer never changes the
//! process-wide current directory and concurrent runs cannot disturb each
//! other.

use crate::command::{CommandExecutor, combined_output, describe_status};
use crate::error::{DeployError, Result};
use std::path::Path;

/// Extracts a staged archive into a directory.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor {
    /// Unpack `archive` into `target_dir`, returning the tool's output.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Extraction`] if the archive cannot be unpacked.
    fn extract(&self, archive: &Path, target_dir: &Path) -> Result<String>;
}

/// Extractor that runs `tar xf <archive>` inside the target directory.
pub struct TarExtractor<'a> {
    executor: &'a dyn CommandExecutor,
}

impl<'a> TarExtractor<'a> {
    /// Create an extractor that launches `tar` through `executor`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self { executor }
    }
}

impl ArchiveExtractor for TarExtractor<'_> {
    fn extract(&self, archive: &Path, target_dir: &Path) -> Result<String> {
        let archive_arg = archive.to_string_lossy();
        let output = self
            .executor
            .run("tar", &["xf", &archive_arg], Some(target_dir))
            .map_err(|e| DeployError::Extraction {
                reason: format!("failed to launch tar: {e}"),
                output: String::new(),
            })?;

        let text = combined_output(&output);
        if output.status.success() {
            Ok(text)
        } else {
            Err(DeployError::Extraction {
                reason: format!("tar xf {archive_arg}: {}", describe_status(&output)),
                output: text,
            })
        }
    }
}
