//! External command execution.
//!
//! Hooks, extraction and synchronisation all shell out. They do so through
//! [`CommandExecutor`] so tests can replace the host system with a stub.

use std::io;
use std::path::Path;
use std::process::{Command, Output};

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs `cmd` with `args` to completion and returns the captured output.
    ///
    /// When `current_dir` is set the child process starts in that directory;
    /// the parent's working directory is never changed.
    ///
    /// # Errors
    ///
    /// Returns any I/O error encountered while spawning or waiting for the
    /// command. A non-zero exit is not an error at this level.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use stretcher::command::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor;
    /// let output = executor.run("tar", &["--version"], None)?;
    /// assert!(output.status.success());
    /// # Ok::<(), std::io::Error>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str], current_dir: Option<&Path>) -> io::Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str], current_dir: Option<&Path>) -> io::Result<Output> {
        let mut command = Command::new(cmd);
        command.args(args);
        if let Some(dir) = current_dir {
            command.current_dir(dir);
        }
        command.output()
    }
}

/// Join a command's stdout and stderr into one lossily-decoded string.
#[must_use]
pub fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}

/// Describe why a finished command counts as a failure.
pub(crate) fn describe_status(output: &Output) -> String {
    output.status.code().map_or_else(
        || format!("terminated by signal ({})", output.status),
        |code| format!("exit status {code}"),
    )
}
