use super::{JobCommand, Launcher, ProcessOutput};
use crate::error::DispatchError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Runs jobs as child processes, blocking the calling task until exit.
/// There is no timeout.
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher {
    pub working_dir: Option<PathBuf>,
}

impl ProcessLauncher {
    pub fn new(working_dir: Option<PathBuf>) -> Self {
        Self { working_dir }
    }
}

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn launch(&self, command: &JobCommand) -> Result<ProcessOutput, DispatchError> {
        // Use string for PATH lookup if not an absolute/relative path
        let program_str = command.program.to_string_lossy();
        let mut cmd = if program_str.contains('/') || program_str.contains('\\') {
            Command::new(&command.program)
        } else {
            Command::new(program_str.as_ref())
        };

        cmd.args(&command.args);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let start = std::time::Instant::now();
        let output = cmd.output().await.map_err(|e| DispatchError::Spawn {
            program: command.program.clone(),
            source: e,
        })?;

        debug!(
            "{} exited with {:?} after {:?}",
            command.program.display(),
            output.status.code(),
            start.elapsed()
        );

        Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
            duration: start.elapsed(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn sh(script: &str) -> JobCommand {
        JobCommand {
            program: PathBuf::from("/bin/sh"),
            args: vec![OsString::from("-c"), OsString::from(script)],
        }
    }

    #[tokio::test]
    async fn test_captures_both_streams() {
        let launcher = ProcessLauncher::default();
        let output = launcher
            .launch(&sh("echo out; echo err 1>&2"))
            .await
            .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_not_an_error() {
        let launcher = ProcessLauncher::default();
        let output = launcher.launch(&sh("exit 3")).await.unwrap();

        assert!(!output.success());
        assert_eq!(output.exit_code, Some(3));
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_spawn() {
        let launcher = ProcessLauncher::default();
        let command = JobCommand {
            program: PathBuf::from("/definitely/not/here"),
            args: Vec::new(),
        };

        assert!(matches!(
            launcher.launch(&command).await,
            Err(DispatchError::Spawn { .. })
        ));
    }
}
