//! Shared test utilities for the deployer.
//!
//! Available to unit tests and, through the `test-support` feature, to the
//! integration suites under `tests/`.

use crate::command::CommandExecutor;
use crate::error::{DeployError, Result};
use crate::extract::ArchiveExtractor;
use crate::locator::SourceOpener;
use crate::sync::DirectorySynchronizer;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code.unsigned_abs())
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g., "rsync").
    pub cmd: &'static str,
    /// The arguments to pass to the command.
    pub args: Vec<String>,
    /// The working directory the command must be started in.
    pub current_dir: Option<PathBuf>,
    /// The result to return when this command is invoked.
    pub result: io::Result<Output>,
}

impl ExpectedCall {
    /// Expect `sh -c <command>` with no working directory override.
    #[must_use]
    pub fn shell(command: &str, result: io::Result<Output>) -> Self {
        Self {
            cmd: "sh",
            args: vec!["-c".to_owned(), command.to_owned()],
            current_dir: None,
            result,
        }
    }
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str], current_dir: Option<&Path>) -> io::Result<Output> {
        let mut expected = self.expected.borrow_mut();
        let Some(call) = expected.pop_front() else {
            panic!("unexpected command invocation: {cmd} {args:?}");
        };

        assert_eq!(call.cmd, cmd);
        assert_eq!(call.args, args);
        assert_eq!(call.current_dir.as_deref(), current_dir);

        call.result
    }
}

/// One command seen by [`RecordingExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommand {
    /// The program name.
    pub cmd: String,
    /// The arguments passed to it.
    pub args: Vec<String>,
    /// The working directory requested for the child.
    pub current_dir: Option<PathBuf>,
}

/// A `CommandExecutor` that records every invocation and reports success.
///
/// Useful where arguments contain generated paths that a [`StubExecutor`]
/// cannot predict.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    calls: RefCell<Vec<RecordedCommand>>,
}

impl RecordingExecutor {
    /// Create an executor with no recorded calls.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The invocations seen so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCommand> {
        self.calls.borrow().clone()
    }
}

impl CommandExecutor for RecordingExecutor {
    fn run(&self, cmd: &str, args: &[&str], current_dir: Option<&Path>) -> io::Result<Output> {
        self.calls.borrow_mut().push(RecordedCommand {
            cmd: cmd.to_owned(),
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
            current_dir: current_dir.map(Path::to_path_buf),
        });
        Ok(success_output())
    }
}

/// Serves a fixed byte payload for any locator and counts the requests.
#[derive(Debug, Default)]
pub struct BytesOpener {
    payload: Vec<u8>,
    opened: Cell<usize>,
}

impl BytesOpener {
    /// Serve `payload` for every locator.
    #[must_use]
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            opened: Cell::new(0),
        }
    }

    /// Number of times a stream was opened.
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.get()
    }
}

impl SourceOpener for BytesOpener {
    fn open(&self, _locator: &str) -> Result<Box<dyn Read>> {
        self.opened.set(self.opened.get() + 1);
        Ok(Box::new(Cursor::new(self.payload.clone())))
    }
}

/// One recorded extractor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractCall {
    /// The staged archive path.
    pub archive: PathBuf,
    /// The directory the archive was unpacked into.
    pub target_dir: PathBuf,
    /// Whether the archive file existed at the time of the call.
    pub archive_existed: bool,
}

/// Extractor that records invocations and optionally delegates.
pub struct RecordingExtractor<'a> {
    inner: Option<&'a dyn ArchiveExtractor>,
    calls: RefCell<Vec<ExtractCall>>,
}

impl<'a> RecordingExtractor<'a> {
    /// Record calls and report success without unpacking anything.
    #[must_use]
    pub fn succeeding() -> Self {
        Self {
            inner: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Record calls, then forward them to `inner`.
    #[must_use]
    pub fn wrapping(inner: &'a dyn ArchiveExtractor) -> Self {
        Self {
            inner: Some(inner),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// The invocations seen so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ExtractCall> {
        self.calls.borrow().clone()
    }
}

impl ArchiveExtractor for RecordingExtractor<'_> {
    fn extract(&self, archive: &Path, target_dir: &Path) -> Result<String> {
        self.calls.borrow_mut().push(ExtractCall {
            archive: archive.to_path_buf(),
            target_dir: target_dir.to_path_buf(),
            archive_existed: archive.exists(),
        });
        match self.inner {
            Some(inner) => inner.extract(archive, target_dir),
            None => Ok(String::new()),
        }
    }
}

/// One recorded synchroniser invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCall {
    /// Source directory, with trailing separator.
    pub from: String,
    /// Destination directory, with trailing separator.
    pub to: String,
    /// Relative paths of the files present under `from` at call time.
    pub source_files: Vec<String>,
}

/// Synchroniser that records invocations and returns a scripted result.
#[derive(Debug, Default)]
pub struct RecordingSynchronizer {
    failure: Option<String>,
    calls: RefCell<Vec<SyncCall>>,
}

impl RecordingSynchronizer {
    /// Record calls and report success.
    #[must_use]
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// Record calls and fail each one with `output`.
    #[must_use]
    pub fn failing(output: &str) -> Self {
        Self {
            failure: Some(output.to_owned()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// The invocations seen so far.
    #[must_use]
    pub fn calls(&self) -> Vec<SyncCall> {
        self.calls.borrow().clone()
    }
}

impl DirectorySynchronizer for RecordingSynchronizer {
    fn sync(&self, from: &str, to: &str) -> Result<String> {
        self.calls.borrow_mut().push(SyncCall {
            from: from.to_owned(),
            to: to.to_owned(),
            source_files: list_files(Path::new(from)),
        });
        match &self.failure {
            Some(output) => Err(DeployError::Sync {
                reason: "exit status 23".to_owned(),
                output: output.clone(),
            }),
            None => Ok(String::new()),
        }
    }
}

/// List regular files below `root` as sorted, `/`-separated relative paths.
#[must_use]
pub fn list_files(root: &Path) -> Vec<String> {
    let mut files = Vec::new();
    collect_files(root, root, &mut files);
    files.sort();
    files
}

fn collect_files(root: &Path, dir: &Path, files: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, files);
        } else if let Ok(relative) = path.strip_prefix(root) {
            let parts: Vec<_> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            files.push(parts.join("/"));
        }
    }
}
