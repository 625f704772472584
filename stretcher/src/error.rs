//! Error types for the deployment pipeline.
//!
//! Every pipeline stage reports failure through [`DeployError`]. Each variant
//! names the stage it belongs to so the caller can tell where a run stopped,
//! and variants raised by external commands carry the command output
//! verbatim for diagnosis.

use std::fmt;
use thiserror::Error;

/// The stages a deployment run passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Resolving the source locator and streaming it into the staging file.
    Fetching,
    /// Comparing the computed digest against the declared checksum.
    Verifying,
    /// Running the manifest's pre-deploy commands.
    PreHooks,
    /// Unpacking the staged archive into the staging directory.
    Extracting,
    /// Mirroring the extracted tree onto the destination.
    Syncing,
    /// Running the manifest's post-deploy commands.
    PostHooks,
    /// The run completed successfully.
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetching => "fetch",
            Self::Verifying => "verify",
            Self::PreHooks => "pre-deploy commands",
            Self::Extracting => "extract",
            Self::Syncing => "sync",
            Self::PostHooks => "post-deploy commands",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Which list of manifest commands a hook belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    /// Commands run before extraction and synchronisation.
    Pre,
    /// Commands run after synchronisation.
    Post,
}

impl HookPhase {
    /// The pipeline stage this phase runs in.
    #[must_use]
    pub const fn stage(self) -> Stage {
        match self {
            Self::Pre => Stage::PreHooks,
            Self::Post => Stage::PostHooks,
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pre => f.write_str("pre"),
            Self::Post => f.write_str("post"),
        }
    }
}

/// Errors that can occur while loading a manifest or deploying it.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The manifest could not be decoded or is missing a required field.
    #[error("invalid manifest: {reason}")]
    Config {
        /// Description of the decoding or validation failure.
        reason: String,
    },

    /// The declared checksum length matches no supported digest algorithm.
    #[error(
        "unsupported checksum \"{checksum}\": expected an md5, sha1, sha256 or sha512 hex \
         digest (32, 40, 64 or 128 characters), got {len} characters"
    )]
    UnsupportedChecksum {
        /// The rejected checksum string.
        checksum: String,
        /// Its length in characters.
        len: usize,
    },

    /// Retrieving or copying the archive failed.
    #[error("fetch failed for {src}: {reason}")]
    Transfer {
        /// The source locator being fetched.
        src: String,
        /// Description of the I/O failure.
        reason: String,
    },

    /// The computed digest differs from the declared checksum.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The checksum declared in the manifest.
        expected: String,
        /// The digest computed from the fetched bytes.
        actual: String,
    },

    /// A pre- or post-deploy command failed to launch or exited non-zero.
    #[error("{phase}-deploy command `{command}` failed: {reason}{}", format_output(.output))]
    Hook {
        /// The hook list the command came from.
        phase: HookPhase,
        /// The failing command line.
        command: String,
        /// Exit status or launch failure description.
        reason: String,
        /// Combined stdout/stderr of the command.
        output: String,
    },

    /// The archive extraction tool failed.
    #[error("extraction failed: {reason}{}", format_output(.output))]
    Extraction {
        /// Exit status or launch failure description.
        reason: String,
        /// Combined stdout/stderr of the extraction tool.
        output: String,
    },

    /// The directory synchronisation tool failed.
    #[error("sync failed: {reason}{}", format_output(.output))]
    Sync {
        /// Exit status or launch failure description.
        reason: String,
        /// Combined stdout/stderr of the synchronisation tool.
        output: String,
    },

    /// A temporary staging file or directory could not be created.
    #[error("failed to create staging {kind}")]
    Staging {
        /// The stage that needed the resource.
        stage: Stage,
        /// Either "file" or "directory".
        kind: &'static str,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl DeployError {
    /// Return the pipeline stage this error was raised in.
    ///
    /// Configuration errors happen before a run starts and report `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use stretcher::error::{DeployError, Stage};
    ///
    /// let err = DeployError::ChecksumMismatch {
    ///     expected: "aa".to_owned(),
    ///     actual: "bb".to_owned(),
    /// };
    /// assert_eq!(err.stage(), Some(Stage::Verifying));
    /// ```
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::Config { .. } => None,
            Self::UnsupportedChecksum { .. } | Self::Transfer { .. } => Some(Stage::Fetching),
            Self::ChecksumMismatch { .. } => Some(Stage::Verifying),
            Self::Hook { phase, .. } => Some(phase.stage()),
            Self::Extraction { .. } => Some(Stage::Extracting),
            Self::Sync { .. } => Some(Stage::Syncing),
            Self::Staging { stage, .. } => Some(*stage),
        }
    }

    /// Build a [`DeployError::Transfer`] from any displayable cause.
    pub(crate) fn transfer(src: &str, reason: impl fmt::Display) -> Self {
        Self::Transfer {
            src: src.to_owned(),
            reason: reason.to_string(),
        }
    }
}

fn format_output(output: &str) -> String {
    let trimmed = output.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n{trimmed}")
    }
}

/// Result type alias using [`DeployError`].
pub type Result<T> = std::result::Result<T, DeployError>;
