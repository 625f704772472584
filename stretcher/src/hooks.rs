//! Pre- and post-deploy command execution.

use crate::command::{CommandExecutor, combined_output, describe_status};
use crate::error::{DeployError, HookPhase, Result};
use log::{debug, info};

/// Shell used to interpret hook command lines.
const SHELL: &str = "sh";

/// Runs manifest hook commands through a shell, in order.
pub struct HookRunner<'a> {
    executor: &'a dyn CommandExecutor,
}

impl<'a> HookRunner<'a> {
    /// Create a runner that launches commands through `executor`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self { executor }
    }

    /// Run each command with `sh -c`, stopping at the first failure.
    ///
    /// Commands after a failing one are never started.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Hook`] naming the phase and the command when a
    /// command cannot be launched or exits non-zero.
    pub fn run_hooks(&self, phase: HookPhase, commands: &[String]) -> Result<()> {
        for command in commands {
            info!("invoking {phase}-deploy command: {command}");
            self.run_one(phase, command)?;
        }
        Ok(())
    }

    fn run_one(&self, phase: HookPhase, command: &str) -> Result<()> {
        let output = self
            .executor
            .run(SHELL, &["-c", command], None)
            .map_err(|e| DeployError::Hook {
                phase,
                command: command.to_owned(),
                reason: format!("failed to launch: {e}"),
                output: String::new(),
            })?;

        let text = combined_output(&output);
        if !output.status.success() {
            return Err(DeployError::Hook {
                phase,
                command: command.to_owned(),
                reason: describe_status(&output),
                output: text,
            });
        }
        if !text.trim().is_empty() {
            debug!("{phase}-deploy command output:\n{}", text.trim_end());
        }
        Ok(())
    }
}
