//! Entrypoint orchestration
//!
//! `Start -> ValidateArgs -> ApplySystemParameters -> WaitForInterfaces ->
//! BuildHandoffArgs -> Exec`. Linear and terminal: nothing runs after a
//! successful handoff.

use std::ffi::OsString;
use tracing::{info, warn};
use vethgate_core::{LaunchConfig, Result};
use vethgate_handoff::{
    ExecvpExecutor, Executor, HandoffOutcome, drop_privileges_and_exec,
};
use vethgate_netwait::{InterfaceProbe, IoctlProbe, ReadinessPoller};
use vethgate_sysctl::{ParameterBackend, ProcfsBackend, SystemParameterWriter};

/// How the wrapper finished when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// No workload arguments were supplied
    NoCommand,

    /// No target user configured, so the workload was never started
    NoTargetUser,

    /// The executor took over the workload
    HandedOff,
}

/// Runs the startup sequence over pluggable backends
pub struct Launcher<B, P, E> {
    config: LaunchConfig,
    writer: SystemParameterWriter<B>,
    poller: ReadinessPoller<P>,
    executor: E,
}

impl Launcher<ProcfsBackend, IoctlProbe, ExecvpExecutor> {
    /// Launcher against the real filesystem, kernel and `execvp`
    pub fn production(config: LaunchConfig) -> Self {
        Self::new(config, ProcfsBackend::new(), IoctlProbe::new(), ExecvpExecutor::new())
    }
}

impl<B, P, E> Launcher<B, P, E>
where
    B: ParameterBackend,
    P: InterfaceProbe,
    E: Executor,
{
    /// Create a launcher over the given backend, probe and executor
    pub fn new(config: LaunchConfig, backend: B, probe: P, executor: E) -> Self {
        let poller = ReadinessPoller::from_config(probe, &config);
        Self {
            config,
            writer: SystemParameterWriter::new(backend),
            poller,
            executor,
        }
    }

    /// Run the startup sequence for `args` (argv without the program name)
    pub async fn run(&self, args: &[OsString]) -> Result<LaunchOutcome> {
        if args.is_empty() {
            warn!("No params");
            return Ok(LaunchOutcome::NoCommand);
        }

        self.writer.apply(&self.config).await;

        let ready = self
            .poller
            .wait_for_interfaces(self.config.interfaces.as_deref())
            .await?;
        if !ready.is_empty() {
            info!(count = ready.len(), "All interfaces up");
        }

        match drop_privileges_and_exec(&self.executor, &self.config, args)? {
            HandoffOutcome::SkippedNoUser => Ok(LaunchOutcome::NoTargetUser),
            HandoffOutcome::Completed => Ok(LaunchOutcome::HandedOff),
        }
    }
}
