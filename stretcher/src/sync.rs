//! Directory synchronisation onto the deploy destination.
//!
//! The extracted tree is mirrored with `rsync -av --delete`: files missing
//! from the source are removed from the destination, so repeated syncs of an
//! unchanged tree are no-ops.

use crate::command::{CommandExecutor, combined_output, describe_status};
use crate::error::{DeployError, Result};

/// Append `/` to `path` unless it already ends with one.
///
/// rsync copies a directory's *contents* only when the source ends with a
/// separator.
///
/// # Examples
///
/// ```
/// use stretcher::sync::with_trailing_separator;
///
/// assert_eq!(with_trailing_separator("/srv/app"), "/srv/app/");
/// assert_eq!(with_trailing_separator("/srv/app/"), "/srv/app/");
/// ```
#[must_use]
pub fn with_trailing_separator(path: &str) -> String {
    if path.ends_with('/') {
        path.to_owned()
    } else {
        format!("{path}/")
    }
}

/// Mirrors one directory onto another.
#[cfg_attr(test, mockall::automock)]
pub trait DirectorySynchronizer {
    /// Mirror `from` onto `to`, deleting extraneous files in `to`.
    ///
    /// Both paths are expected to end in `/`.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Sync`] if the synchronisation fails.
    fn sync(&self, from: &str, to: &str) -> Result<String>;
}

/// Synchroniser that shells out to `rsync`.
pub struct RsyncSynchronizer<'a> {
    executor: &'a dyn CommandExecutor,
}

impl<'a> RsyncSynchronizer<'a> {
    /// Create a synchroniser that launches `rsync` through `executor`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self { executor }
    }
}

impl DirectorySynchronizer for RsyncSynchronizer<'_> {
    fn sync(&self, from: &str, to: &str) -> Result<String> {
        let output = self
            .executor
            .run("rsync", &["-av", "--delete", from, to], None)
            .map_err(|e| DeployError::Sync {
                reason: format!("failed to launch rsync: {e}"),
                output: String::new(),
            })?;

        let text = combined_output(&output);
        if output.status.success() {
            Ok(text)
        } else {
            Err(DeployError::Sync {
                reason: format!("rsync -av --delete {from} {to}: {}", describe_status(&output)),
                output: text,
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_utils::{ExpectedCall, StubExecutor, failure_output, success_output};
    use rstest::rstest;

    #[rstest]
    #[case("", "/")]
    #[case("app", "app/")]
    #[case("/srv/app", "/srv/app/")]
    #[case("/srv/app/", "/srv/app/")]
    fn normalises_trailing_separator(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(with_trailing_separator(input), expected);
        assert_eq!(with_trailing_separator(expected), expected);
    }

    #[test]
    fn invokes_rsync_with_mirror_semantics() {
        let executor = StubExecutor::new(vec![ExpectedCall {
            cmd: "rsync",
            args: vec![
                "-av".to_owned(),
                "--delete".to_owned(),
                "/tmp/src/".to_owned(),
                "/srv/app/".to_owned(),
            ],
            current_dir: None,
            result: Ok(success_output()),
        }]);

        RsyncSynchronizer::new(&executor)
            .sync("/tmp/src/", "/srv/app/")
            .expect("sync succeeds");

        executor.assert_finished();
    }

    #[test]
    fn non_zero_exit_is_sync_error() {
        let executor = StubExecutor::new(vec![ExpectedCall {
            cmd: "rsync",
            args: vec![
                "-av".to_owned(),
                "--delete".to_owned(),
                "/a/".to_owned(),
                "/b/".to_owned(),
            ],
            current_dir: None,
            result: Ok(failure_output("rsync: change_dir \"/a\" failed")),
        }]);

        let err = RsyncSynchronizer::new(&executor)
            .sync("/a/", "/b/")
            .expect_err("rsync fails");

        assert!(matches!(err, DeployError::Sync { .. }));
        assert!(err.to_string().contains("change_dir"));
    }
}
