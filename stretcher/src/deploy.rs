//! Deployment orchestration.
//!
//! A run moves strictly forward through
//! fetch → verify → pre-deploy commands → extract → sync → post-deploy
//! commands, stopping at the first failure. The staged archive and the
//! extraction directory are scoped values: they are removed when the run
//! returns, whichever stage it stopped in.

use crate::checksum::{DigestAlgorithm, verify_checksum};
use crate::command::{CommandExecutor, SystemCommandExecutor};
use crate::copier::{CopyOutcome, copy_and_hash};
use crate::error::{DeployError, HookPhase, Result, Stage};
use crate::extract::{ArchiveExtractor, TarExtractor};
use crate::hooks::HookRunner;
use crate::locator::{DefaultSourceOpener, SourceOpener};
use crate::manifest::Manifest;
use crate::sync::{DirectorySynchronizer, RsyncSynchronizer, with_trailing_separator};
use log::{debug, info, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir, TempPath};

/// Filename prefix of the staged archive.
const ARCHIVE_PREFIX: &str = "stretcher";
/// Directory name prefix of the extraction directory.
const EXTRACT_PREFIX: &str = "stretcher_src";

/// Where a run creates its temporary artefacts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingConfig {
    /// Parent directory for the staged archive and extraction directory.
    /// `None` uses the system temporary directory.
    pub temp_root: Option<PathBuf>,
}

impl StagingConfig {
    /// Stage under `root` instead of the system temporary directory.
    #[must_use]
    pub fn in_dir(root: impl Into<PathBuf>) -> Self {
        Self {
            temp_root: Some(root.into()),
        }
    }

    fn builder(prefix: &str) -> Builder<'_, 'static> {
        let mut builder = Builder::new();
        builder.prefix(prefix);
        builder
    }

    fn archive_file(&self) -> Result<tempfile::NamedTempFile> {
        let builder = Self::builder(ARCHIVE_PREFIX);
        let created = match &self.temp_root {
            Some(root) => builder.tempfile_in(root),
            None => builder.tempfile(),
        };
        created.map_err(|source| DeployError::Staging {
            stage: Stage::Fetching,
            kind: "file",
            source,
        })
    }

    fn extract_dir(&self) -> Result<TempDir> {
        let builder = Self::builder(EXTRACT_PREFIX);
        let created = match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        created.map_err(|source| DeployError::Staging {
            stage: Stage::Extracting,
            kind: "directory",
            source,
        })
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    /// Size of the fetched archive in bytes.
    pub bytes_written: u64,
    /// Lower-case hex digest of the archive.
    pub digest: String,
    /// Algorithm the digest was computed with.
    pub algorithm: DigestAlgorithm,
    /// Whether the digest was compared against a declared checksum.
    pub verified: bool,
}

/// The steps a run would perform, for dry-run display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployPlan {
    steps: Vec<(Stage, String)>,
}

impl DeployPlan {
    /// The planned steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[(Stage, String)] {
        &self.steps
    }
}

impl fmt::Display for DeployPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (stage, description)) in self.steps.iter().enumerate() {
            writeln!(f, "  {}. [{stage}] {description}", index + 1)?;
        }
        Ok(())
    }
}

/// Describe what deploying `manifest` would do, without side effects.
///
/// # Errors
///
/// Returns [`DeployError::UnsupportedChecksum`] if the checksum length
/// matches no supported algorithm.
pub fn plan(manifest: &Manifest) -> Result<DeployPlan> {
    let mut steps = Vec::new();
    steps.push((Stage::Fetching, format!("fetch {}", manifest.src())));
    let verify = match manifest.digest_algorithm()? {
        Some(algorithm) => format!("verify {algorithm} checksum {}", manifest.checksum()),
        None => "skip verification (no checksum declared)".to_owned(),
    };
    steps.push((Stage::Verifying, verify));
    for command in manifest.pre_commands() {
        steps.push((Stage::PreHooks, format!("sh -c {command:?}")));
    }
    steps.push((Stage::Extracting, "tar xf <archive> in staging directory".to_owned()));
    steps.push((
        Stage::Syncing,
        format!(
            "rsync -av --delete <staging>/ {}",
            with_trailing_separator(manifest.dest())
        ),
    ));
    for command in manifest.post_commands() {
        steps.push((Stage::PostHooks, format!("sh -c {command:?}")));
    }
    steps.push((
        Stage::Done,
        "remove staged archive and extraction directory".to_owned(),
    ));
    Ok(DeployPlan { steps })
}

/// Deploy `manifest` using the host's `sh`, `tar` and `rsync`.
///
/// # Errors
///
/// Returns the first error raised by any stage; see [`Deployer::deploy`].
pub fn deploy(manifest: &Manifest, staging: StagingConfig) -> Result<DeployReport> {
    let executor = SystemCommandExecutor;
    let extractor = TarExtractor::new(&executor);
    let synchronizer = RsyncSynchronizer::new(&executor);
    Deployer::new(&DefaultSourceOpener, &executor, &extractor, &synchronizer)
        .with_staging(staging)
        .deploy(manifest)
}

/// Runs deployments against injected collaborators.
pub struct Deployer<'a> {
    opener: &'a dyn SourceOpener,
    hooks: HookRunner<'a>,
    extractor: &'a dyn ArchiveExtractor,
    synchronizer: &'a dyn DirectorySynchronizer,
    staging: StagingConfig,
}

/// The fetched archive, removed from disk when dropped.
struct StagedArchive {
    path: TempPath,
    copy: CopyOutcome,
    algorithm: DigestAlgorithm,
}

impl<'a> Deployer<'a> {
    /// Wire a deployer from its collaborators.
    ///
    /// `hook_executor` runs the manifest's pre- and post-deploy commands.
    #[must_use]
    pub fn new(
        opener: &'a dyn SourceOpener,
        hook_executor: &'a dyn CommandExecutor,
        extractor: &'a dyn ArchiveExtractor,
        synchronizer: &'a dyn DirectorySynchronizer,
    ) -> Self {
        Self {
            opener,
            hooks: HookRunner::new(hook_executor),
            extractor,
            synchronizer,
            staging: StagingConfig::default(),
        }
    }

    /// Use `staging` for temporary artefacts.
    #[must_use]
    pub fn with_staging(mut self, staging: StagingConfig) -> Self {
        self.staging = staging;
        self
    }

    /// Run the full pipeline for `manifest`.
    ///
    /// The checksum is verified before any command runs or anything is
    /// extracted. Temporary artefacts are removed before this returns, on
    /// success and on every failure path.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure: [`DeployError::UnsupportedChecksum`]
    /// or [`DeployError::Transfer`] while fetching,
    /// [`DeployError::ChecksumMismatch`] while verifying,
    /// [`DeployError::Hook`] from either command list,
    /// [`DeployError::Extraction`], [`DeployError::Sync`], or
    /// [`DeployError::Staging`] when a temporary resource cannot be created.
    pub fn deploy(&self, manifest: &Manifest) -> Result<DeployReport> {
        let expected = manifest.digest_algorithm()?;
        let archive = self.fetch(manifest.src(), expected)?;

        let verified = verify_archive(manifest.checksum(), &archive)?;

        self.hooks
            .run_hooks(HookPhase::Pre, manifest.pre_commands())?;

        let extracted = self.extract(&archive.path)?;

        self.sync(extracted.path(), manifest.dest())?;

        self.hooks
            .run_hooks(HookPhase::Post, manifest.post_commands())?;

        info!(
            "{}: deployed {} to {}",
            Stage::Done,
            manifest.src(),
            manifest.dest()
        );
        Ok(DeployReport {
            bytes_written: archive.copy.bytes_written,
            digest: archive.copy.digest,
            algorithm: archive.algorithm,
            verified,
        })
    }

    fn fetch(&self, src: &str, expected: Option<DigestAlgorithm>) -> Result<StagedArchive> {
        let algorithm = expected.unwrap_or(DigestAlgorithm::UNVERIFIED_DEFAULT);
        info!("fetching {src}");
        let mut reader = self.opener.open(src)?;
        let mut file = self.staging.archive_file()?;

        let copy = copy_and_hash(file.as_file_mut(), &mut reader, algorithm)
            .map_err(|e| DeployError::transfer(src, e))?;
        let path = file.into_temp_path();
        info!("wrote {} bytes to {}", copy.bytes_written, path.display());

        Ok(StagedArchive {
            path,
            copy,
            algorithm,
        })
    }

    fn extract(&self, archive: &Path) -> Result<TempDir> {
        let dir = self.staging.extract_dir()?;
        info!(
            "extracting archive {} to {}",
            archive.display(),
            dir.path().display()
        );
        let output = self.extractor.extract(archive, dir.path())?;
        log_tool_output("tar", &output);
        Ok(dir)
    }

    fn sync(&self, extracted: &Path, dest: &str) -> Result<()> {
        let from = with_trailing_separator(&extracted.to_string_lossy());
        let to = with_trailing_separator(dest);
        info!("rsync -av --delete {from} {to}");
        let output = self.synchronizer.sync(&from, &to)?;
        log_tool_output("rsync", &output);
        Ok(())
    }
}

fn verify_archive(checksum: &str, archive: &StagedArchive) -> Result<bool> {
    let digest = &archive.copy.digest;
    if checksum.is_empty() {
        warn!(
            "no checksum declared; skipping verification ({} {digest})",
            archive.algorithm
        );
        return Ok(false);
    }
    verify_checksum(checksum, digest)?;
    info!("checksum ok: {digest}");
    Ok(true)
}

fn log_tool_output(tool: &str, output: &str) {
    let trimmed = output.trim_end();
    if !trimmed.is_empty() {
        debug!("{tool} output:\n{trimmed}");
    }
}

#[cfg(all(test, unix))]
#[path = "deploy_tests.rs"]
mod tests;
