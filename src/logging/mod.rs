//! Process-wide and per-job log sinks
//!
//! The process-wide sink (console plus an optional run log file) is a
//! `tracing` subscriber installed once in `main`. Job sinks are owned
//! [`JobLog`] handles that live only for one dispatch.

mod job_log;

pub use job_log::JobLog;

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the console and run-log layers
pub fn init(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let directive = if verbose {
        "expbatch=debug"
    } else {
        "expbatch=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let console = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let run_log = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(run_log)
        .try_init()?;

    Ok(())
}
