//! Post-update side effects.

use std::ffi::OsString;

use tracing::{error, info};

use super::mapping::Mapping;
use super::types::{CommandError, CommandRunner};

const SHELL: &str = "sh";

/// What happened when a mapping's command ran.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EffectOutcome {
    /// The mapping has no command.
    Skipped,
    /// The command exited zero.
    Succeeded {
        /// Combined stdout and stderr.
        output: String,
    },
    /// The command exited non-zero or was killed by a signal.
    Failed {
        /// Exit code, absent when terminated by a signal.
        code: Option<i32>,
        /// Combined stdout and stderr.
        output: String,
    },
    /// The command could not be started.
    SpawnFailed(CommandError),
}

impl EffectOutcome {
    /// Returns `true` for [`EffectOutcome::Succeeded`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Runs the command attached to a freshly written mapping.
pub trait EffectExecutor {
    /// Executes `command` on behalf of `mapping`. Failures are reported in
    /// the outcome and never abort the caller.
    fn execute(&self, mapping: &Mapping, command: &str) -> EffectOutcome;
}

/// Executes commands through `sh -c`, blocking until they exit.
#[derive(Clone, Debug, Default)]
pub struct ShellEffectExecutor<R> {
    runner: R,
}

impl<R: CommandRunner> ShellEffectExecutor<R> {
    /// Wraps `runner`.
    #[must_use]
    pub const fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> EffectExecutor for ShellEffectExecutor<R> {
    fn execute(&self, mapping: &Mapping, command: &str) -> EffectOutcome {
        info!(gist_file = mapping.remote_name(), command, "executing command");
        let args = [OsString::from("-c"), OsString::from(command)];
        match self.runner.run(SHELL, &args) {
            Ok(output) if output.is_success() => {
                info!(gist_file = mapping.remote_name(), "command executed successfully");
                EffectOutcome::Succeeded {
                    output: output.combined(),
                }
            }
            Ok(output) => {
                let combined = output.combined();
                error!(
                    gist_file = mapping.remote_name(),
                    command,
                    code = ?output.code,
                    output = %combined,
                    "command failed"
                );
                EffectOutcome::Failed {
                    code: output.code,
                    output: combined,
                }
            }
            Err(err) => {
                error!(gist_file = mapping.remote_name(), command, error = %err, "command failed to start");
                EffectOutcome::SpawnFailed(err)
            }
        }
    }
}
