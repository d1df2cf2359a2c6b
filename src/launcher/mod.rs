mod process;

pub use process::ProcessLauncher;

use crate::error::DispatchError;
use async_trait::async_trait;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Fully-built invocation of the external program for one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl fmt::Display for JobCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Captured result of a finished process. Both streams are fully buffered.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub duration: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[async_trait]
pub trait Launcher: Send + Sync {
    /// Run the command to completion and capture its output
    async fn launch(&self, command: &JobCommand) -> Result<ProcessOutput, DispatchError>;
}
