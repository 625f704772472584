//! End-to-end deployment tests against the host's `sh`, `tar` and `rsync`.
//!
//! Tests that need a tool the host does not provide report the skip on
//! stderr and return early. The unit suite covers the same orchestration
//! with recorded collaborators.

mod support;

use rstest::{fixture, rstest};
use std::path::{Path, PathBuf};
use stretcher::checksum::DigestAlgorithm;
use stretcher::command::SystemCommandExecutor;
use stretcher::deploy::{Deployer, StagingConfig};
use stretcher::error::{DeployError, Stage};
use stretcher::extract::TarExtractor;
use stretcher::locator::DefaultSourceOpener;
use stretcher::manifest::{Manifest, parse_manifest};
use stretcher::sync::RsyncSynchronizer;
use stretcher::test_utils::{RecordingExtractor, RecordingSynchronizer, list_files};
use support::{ARCHIVE_FILES, build_archive, file_digest, staged_entries, tool_available};
use tempfile::TempDir;

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn archive(&self) -> PathBuf {
        self.dir.path().join("a.tar")
    }

    fn staging_root(&self) -> PathBuf {
        self.dir.path().join("staging")
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

#[fixture]
fn sandbox() -> Sandbox {
    let dir = TempDir::new().expect("failed to create temp dir");
    let sandbox = Sandbox { dir };
    build_archive(&sandbox.archive(), ARCHIVE_FILES);
    std::fs::create_dir(sandbox.staging_root()).expect("failed to create staging root");
    sandbox
}

fn manifest_yaml(src: &str, checksum: &str, dest: &str, pre: &[String]) -> Manifest {
    let mut yaml = format!("src: {src}\nchecksum: \"{checksum}\"\ndest: {dest}\n");
    if !pre.is_empty() {
        yaml.push_str("commands:\n  pre:\n");
        for command in pre {
            yaml.push_str(&format!("    - {command:?}\n"));
        }
    }
    parse_manifest(yaml.as_bytes()).expect("valid manifest")
}

fn expected_files() -> Vec<String> {
    let mut files: Vec<String> = ARCHIVE_FILES
        .iter()
        .map(|(name, _)| (*name).to_owned())
        .collect();
    files.sort();
    files
}

fn assert_tree_matches_archive(root: &Path) {
    assert_eq!(list_files(root), expected_files());
    for (name, contents) in ARCHIVE_FILES {
        let actual = std::fs::read(root.join(name)).expect("failed to read deployed file");
        assert_eq!(actual, *contents, "content of {name}");
    }
}

#[rstest]
#[case::file_url(true)]
#[case::bare_path(false)]
fn verified_archive_is_extracted_and_synced_once(sandbox: Sandbox, #[case] file_url: bool) {
    if !tool_available("tar") {
        eprintln!("skipping extraction check: tar is required");
        return;
    }
    let archive = sandbox.archive();
    let src = if file_url {
        format!("file://{}", archive.display())
    } else {
        archive.display().to_string()
    };
    let checksum = file_digest(&archive, DigestAlgorithm::Md5);
    let manifest = manifest_yaml(&src, &checksum, "/srv/app/", &[]);

    let executor = SystemCommandExecutor;
    let tar = TarExtractor::new(&executor);
    let extractor = RecordingExtractor::wrapping(&tar);
    let synchronizer = RecordingSynchronizer::succeeding();

    let report = Deployer::new(&DefaultSourceOpener, &executor, &extractor, &synchronizer)
        .with_staging(StagingConfig::in_dir(sandbox.staging_root()))
        .deploy(&manifest)
        .expect("deploy succeeds");

    assert!(report.verified);
    assert_eq!(report.digest, checksum);

    let extract_calls = extractor.calls();
    assert_eq!(extract_calls.len(), 1);
    let extracted = &extract_calls[0].target_dir;

    let sync_calls = synchronizer.calls();
    assert_eq!(sync_calls.len(), 1);
    assert_eq!(sync_calls[0].from, format!("{}/", extracted.display()));
    assert_eq!(sync_calls[0].to, "/srv/app/");
    assert_eq!(sync_calls[0].source_files, expected_files());

    assert!(!extracted.exists());
    assert!(staged_entries(&sandbox.staging_root()).is_empty());
}

#[rstest]
fn wrong_checksum_digit_aborts_before_hooks(sandbox: Sandbox) {
    let archive = sandbox.archive();
    let mut checksum = file_digest(&archive, DigestAlgorithm::Md5);
    let flipped = if checksum.starts_with('0') { "1" } else { "0" };
    checksum.replace_range(..1, flipped);
    let sentinel = sandbox.path("sentinel");
    let touch = format!("touch '{}'", sentinel.display());
    let manifest = manifest_yaml(&archive.display().to_string(), &checksum, "/srv/app", &[touch]);

    let executor = SystemCommandExecutor;
    let extractor = RecordingExtractor::succeeding();
    let synchronizer = RecordingSynchronizer::succeeding();

    let err = Deployer::new(&DefaultSourceOpener, &executor, &extractor, &synchronizer)
        .with_staging(StagingConfig::in_dir(sandbox.staging_root()))
        .deploy(&manifest)
        .expect_err("checksum mismatch");

    assert!(matches!(err, DeployError::ChecksumMismatch { .. }));
    assert!(!sentinel.exists(), "pre-deploy command must not run");
    assert!(extractor.calls().is_empty());
    assert!(synchronizer.calls().is_empty());
    assert!(staged_entries(&sandbox.staging_root()).is_empty());
}

#[rstest]
fn failing_pre_hook_prevents_extraction_and_sync(sandbox: Sandbox) {
    let archive = sandbox.archive();
    let checksum = file_digest(&archive, DigestAlgorithm::Sha256);
    let manifest = manifest_yaml(
        &archive.display().to_string(),
        &checksum,
        "/srv/app",
        &["echo stopping; exit 3".to_owned()],
    );

    let executor = SystemCommandExecutor;
    let extractor = RecordingExtractor::succeeding();
    let synchronizer = RecordingSynchronizer::succeeding();

    let err = Deployer::new(&DefaultSourceOpener, &executor, &extractor, &synchronizer)
        .with_staging(StagingConfig::in_dir(sandbox.staging_root()))
        .deploy(&manifest)
        .expect_err("pre hook fails");

    assert_eq!(err.stage(), Some(Stage::PreHooks));
    assert!(err.to_string().contains("exit status 3"));
    assert!(err.to_string().contains("stopping"));
    assert!(extractor.calls().is_empty());
    assert!(synchronizer.calls().is_empty());
    assert!(staged_entries(&sandbox.staging_root()).is_empty());
}

#[rstest]
fn missing_source_is_a_transfer_error(sandbox: Sandbox) {
    let missing = sandbox.path("absent.tar");
    let manifest = manifest_yaml(&missing.display().to_string(), "", "/srv/app", &[]);

    let executor = SystemCommandExecutor;
    let extractor = RecordingExtractor::succeeding();
    let synchronizer = RecordingSynchronizer::succeeding();

    let err = Deployer::new(&DefaultSourceOpener, &executor, &extractor, &synchronizer)
        .with_staging(StagingConfig::in_dir(sandbox.staging_root()))
        .deploy(&manifest)
        .expect_err("source missing");

    assert!(matches!(err, DeployError::Transfer { .. }));
    assert!(extractor.calls().is_empty());
    assert!(staged_entries(&sandbox.staging_root()).is_empty());
}

#[rstest]
fn repeated_deploys_mirror_the_archive(sandbox: Sandbox) {
    if !tool_available("tar") || !tool_available("rsync") {
        eprintln!("skipping mirror check: tar and rsync are required");
        return;
    }
    let dest = sandbox.path("dest");
    std::fs::create_dir(&dest).expect("failed to create dest");
    std::fs::write(dest.join("stale.txt"), b"left over").expect("failed to write stale file");

    let archive = sandbox.archive();
    let checksum = file_digest(&archive, DigestAlgorithm::Sha1);
    let manifest = manifest_yaml(
        &archive.display().to_string(),
        &checksum,
        &dest.display().to_string(),
        &[],
    );

    let executor = SystemCommandExecutor;
    let extractor = TarExtractor::new(&executor);
    let synchronizer = RsyncSynchronizer::new(&executor);
    let deployer = Deployer::new(&DefaultSourceOpener, &executor, &extractor, &synchronizer)
        .with_staging(StagingConfig::in_dir(sandbox.staging_root()));

    deployer.deploy(&manifest).expect("first deploy succeeds");
    assert_tree_matches_archive(&dest);

    deployer.deploy(&manifest).expect("second deploy succeeds");
    assert_tree_matches_archive(&dest);
    assert!(staged_entries(&sandbox.staging_root()).is_empty());
}
