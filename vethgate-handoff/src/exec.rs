//! Process replacement

use nix::errno::Errno;
use nix::unistd::execvp;
use std::ffi::OsString;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};
use vethgate_core::{Error, LaunchConfig, Result};

use crate::argv::HandoffCommand;

/// Replaces the current process with a new program
///
/// On success the production implementation never returns: the wrapper's
/// PID, descriptors and environment now belong to the new image. `Ok(())`
/// therefore only comes back from executors that stand in for a real exec,
/// and means the wrapper's work is complete.
pub trait Executor {
    /// Replace the current process with `command`
    ///
    /// # Errors
    /// Returns [`Error::Handoff`] if the program cannot be executed
    fn exec(&self, command: &HandoffCommand) -> Result<()>;
}

/// Executor backed by `execvp(3)`, searching `PATH` for argv\[0\]
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecvpExecutor;

impl ExecvpExecutor {
    /// Create a new `execvp` executor
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Executor for ExecvpExecutor {
    fn exec(&self, command: &HandoffCommand) -> Result<()> {
        let argv = command.to_cstrings()?;

        debug!(argv = ?command.argv(), "Calling execvp");

        // Only the error arm is inhabited: a successful exec never returns
        let Err(errno) = execvp(&argv[0], &argv);

        Err(Error::Handoff {
            program: command.program().to_string_lossy().into_owned(),
            source: errno,
        })
    }
}

/// Executor that records commands instead of executing them
#[derive(Clone, Default)]
pub struct MockExecutor {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    commands: Vec<HandoffCommand>,
    failure: Option<Errno>,
}

impl MockExecutor {
    /// Create a new mock executor that always "succeeds"
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock executor whose exec fails with `errno`
    #[must_use]
    pub fn failing(errno: Errno) -> Self {
        let executor = Self::new();
        executor.lock().failure = Some(errno);
        executor
    }

    /// Every command passed to [`Executor::exec`], in order
    #[must_use]
    pub fn commands(&self) -> Vec<HandoffCommand> {
        self.lock().commands.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for MockExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockExecutor").finish_non_exhaustive()
    }
}

impl Executor for MockExecutor {
    fn exec(&self, command: &HandoffCommand) -> Result<()> {
        let mut state = self.lock();
        state.commands.push(command.clone());

        match state.failure {
            Some(errno) => Err(Error::Handoff {
                program: command.program().to_string_lossy().into_owned(),
                source: errno,
            }),
            None => Ok(()),
        }
    }
}

/// How the handoff step ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffOutcome {
    /// No target user configured; the workload was not started
    SkippedNoUser,

    /// The executor took over; the wrapper has nothing left to do
    Completed,
}

/// Re-execute `args` as the configured target user
///
/// Builds `{tool, -E, -u, user} ++ args` and hands it to `executor`. When
/// no target user is configured this is a no-op that only logs.
///
/// # Errors
/// Returns [`Error::Handoff`] if the privilege-drop tool cannot be executed
pub fn drop_privileges_and_exec<E: Executor>(
    executor: &E,
    config: &LaunchConfig,
    args: &[OsString],
) -> Result<HandoffOutcome> {
    let Some(user) = config.target_user.as_ref() else {
        warn!("No user");
        return Ok(HandoffOutcome::SkippedNoUser);
    };

    let command = HandoffCommand::new(&config.privilege_prefix(user), args)?;

    info!(
        user = %user,
        tool = %config.privilege_tool,
        program = ?args.first(),
        "Handing off workload"
    );

    executor.exec(&command)?;
    Ok(HandoffOutcome::Completed)
}
