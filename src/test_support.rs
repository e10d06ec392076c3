//! Test support utilities shared across unit and integration tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::rc::Rc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

use crate::remote::{Collection, RemoteCollection, RemoteFuture};
use crate::sync::{CommandError, CommandOutput, CommandRunner, EffectExecutor, EffectOutcome, Mapping};

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Rc<RefCell<VecDeque<CommandOutput>>>,
    invocations: Rc<RefCell<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.responses.borrow_mut().push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, CommandError> {
        self.invocations.borrow_mut().push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| CommandError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

/// Error produced by [`ScriptedRemote`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{message}")]
pub struct ScriptedRemoteError {
    /// Error text.
    pub message: String,
    /// Whether the accessor classifies the error as rate limiting.
    pub rate_limited: bool,
}

/// Remote collection double that replays queued fetch results.
///
/// An exhausted queue yields a non-rate-limit error.
#[derive(Clone, Debug)]
pub struct ScriptedRemote {
    responses: Rc<RefCell<VecDeque<Result<Collection, ScriptedRemoteError>>>>,
    fetches: Rc<Cell<usize>>,
    minimum_interval: Duration,
}

impl ScriptedRemote {
    /// Creates a remote with the given interval floor.
    #[must_use]
    pub fn new(minimum_interval: Duration) -> Self {
        Self {
            responses: Rc::default(),
            fetches: Rc::default(),
            minimum_interval,
        }
    }

    /// Queues a successful fetch.
    pub fn push_collection(&self, collection: Collection) {
        self.responses.borrow_mut().push_back(Ok(collection));
    }

    /// Queues a rate-limit error.
    pub fn push_rate_limited(&self) {
        self.responses.borrow_mut().push_back(Err(ScriptedRemoteError {
            message: String::from("API rate limit exceeded"),
            rate_limited: true,
        }));
    }

    /// Queues a non-rate-limit error.
    pub fn push_error(&self, message: impl Into<String>) {
        self.responses.borrow_mut().push_back(Err(ScriptedRemoteError {
            message: message.into(),
            rate_limited: false,
        }));
    }

    /// Number of fetches performed so far.
    #[must_use]
    pub fn fetches(&self) -> usize {
        self.fetches.get()
    }
}

impl RemoteCollection for ScriptedRemote {
    type Error = ScriptedRemoteError;

    fn fetch_all(&self) -> RemoteFuture<'_, Collection, Self::Error> {
        self.fetches.set(self.fetches.get().saturating_add(1));
        let next = self.responses.borrow_mut().pop_front().unwrap_or_else(|| {
            Err(ScriptedRemoteError {
                message: String::from("no scripted collection available"),
                rate_limited: false,
            })
        });
        Box::pin(std::future::ready(next))
    }

    fn is_rate_limited(&self, error: &Self::Error) -> bool {
        error.rate_limited
    }

    fn minimum_interval(&self) -> Duration {
        self.minimum_interval
    }
}

/// One command seen by [`RecordingExecutor`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecutedCommand {
    /// Remote entry name of the mapping.
    pub remote_name: String,
    /// Command text.
    pub command: String,
}

/// Effect executor that records commands and returns a fixed outcome.
#[derive(Clone, Debug)]
pub struct RecordingExecutor {
    executed: Rc<RefCell<Vec<ExecutedCommand>>>,
    outcome: EffectOutcome,
}

impl RecordingExecutor {
    /// Creates an executor whose commands all succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_outcome(EffectOutcome::Succeeded {
            output: String::new(),
        })
    }

    /// Creates an executor that always reports `outcome`.
    #[must_use]
    pub fn with_outcome(outcome: EffectOutcome) -> Self {
        Self {
            executed: Rc::default(),
            outcome,
        }
    }

    /// Commands executed so far, in order.
    #[must_use]
    pub fn executed(&self) -> Vec<ExecutedCommand> {
        self.executed.borrow().clone()
    }
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectExecutor for RecordingExecutor {
    fn execute(&self, mapping: &Mapping, command: &str) -> EffectOutcome {
        self.executed.borrow_mut().push(ExecutedCommand {
            remote_name: mapping.remote_name().to_owned(),
            command: command.to_owned(),
        });
        self.outcome.clone()
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets and removes environment variables while holding a global mutex.
    /// A `None` value removes the variable for the guard's lifetime.
    pub async fn set_vars(pairs: &[(&str, Option<&str>)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe {
                match value {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
