//! Vethgate container entrypoint
//!
//! `vethgate <program> [args...]` applies startup tunables, waits for the
//! orchestrator's veth interfaces to come up, then re-executes the workload
//! as the unprivileged user named in `APPNAME` through `sudo -E -u`.

use anyhow::{Context, Result, anyhow};
use std::ffi::OsString;
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use vethgate_core::LaunchConfig;
use vethgate_core::config::LOG_ENV;

mod run;

use run::Launcher;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("warning: {e:#}");
    }

    // argv is passed through verbatim, so nothing here interprets options
    let args: Vec<OsString> = std::env::args_os().skip(1).collect();

    let config = LaunchConfig::from_env();
    debug!(?config, "Loaded configuration");

    match Launcher::production(config).run(&args).await {
        Ok(outcome) => debug!(?outcome, "Exiting without handoff"),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(e.exit_code());
        }
    }
}

/// Log to stderr so the workload's stdout stays clean
fn init_tracing() -> Result<()> {
    let filter = match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new("info").context("Failed to build default log filter")?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!(e))
        .context("Failed to initialize logging")
}
