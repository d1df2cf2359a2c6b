use super::command::build_command;
use super::completion::{claim, is_complete, Claim};
use super::job::JobDescriptor;
use crate::config::{Config, FailurePolicy};
use crate::launcher::{Launcher, ProcessOutput};
use crate::logging::JobLog;
use futures::FutureExt;
use std::any::Any;
use std::fs::{self, File};
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Completed,
    Skipped { reason: String },
    Failed { error: String, discarded: bool },
}

impl JobStatus {
    pub fn was_dispatched(&self) -> bool {
        !matches!(self, JobStatus::Skipped { .. })
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Skipped { reason } => write!(f, "skipped: {}", reason),
            JobStatus::Failed { error, .. } => write!(f, "failed: {}", error),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job: String,
    pub output_dir: PathBuf,
    pub status: JobStatus,
    pub duration: Duration,
}

/// Runs one job: completion gate, claim, launch, capture, failure policy
pub struct Dispatcher {
    config: Arc<Config>,
    launcher: Arc<dyn Launcher>,
}

impl Dispatcher {
    pub fn new(config: Arc<Config>, launcher: Arc<dyn Launcher>) -> Self {
        Self { config, launcher }
    }

    pub async fn dispatch(&self, job: &JobDescriptor) -> JobOutcome {
        let start = Instant::now();
        let outcome = |status: JobStatus| JobOutcome {
            job: job.to_string(),
            output_dir: job.output_dir.clone(),
            status,
            duration: start.elapsed(),
        };

        if is_complete(&job.output_dir) {
            info!(
                "Output exists for {}, skipping",
                job.output_dir.display()
            );
            return outcome(JobStatus::Skipped {
                reason: "output exists".to_string(),
            });
        }

        let file = match claim(&job.output_dir) {
            Ok(Claim::Claimed(file)) => file,
            Ok(Claim::Taken) => {
                info!("{} already claimed by another worker, skipping", job);
                return outcome(JobStatus::Skipped {
                    reason: "claimed by another worker".to_string(),
                });
            }
            Err(e) => {
                error!("Cannot start {}: {}", job, e);
                return outcome(JobStatus::Failed {
                    error: e.to_string(),
                    discarded: false,
                });
            }
        };

        // a panic while the job holds its claim goes through the failure policy
        let failure = match AssertUnwindSafe(self.attempt(job, file)).catch_unwind().await {
            Ok(failure) => failure,
            Err(panic) => {
                let reason = format!("job panicked: {}", panic_message(&*panic));
                error!("{}: {}", job, reason);
                Some(reason)
            }
        };

        let Some(error) = failure else {
            return outcome(JobStatus::Completed);
        };

        let discarded = match self.config.on_failure {
            FailurePolicy::Keep => false,
            FailurePolicy::Discard => match fs::remove_dir_all(&job.output_dir) {
                Ok(()) => {
                    info!("Discarded output of failed job {}", job);
                    true
                }
                Err(e) => {
                    warn!(
                        "Failed to discard {}: {}",
                        job.output_dir.display(),
                        e
                    );
                    false
                }
            },
        };

        outcome(JobStatus::Failed { error, discarded })
    }

    /// Launch with the job log attached. The log is detached when this
    /// returns or unwinds, before any cleanup.
    async fn attempt(&self, job: &JobDescriptor, file: File) -> Option<String> {
        let command = build_command(&self.config, job);
        let mut log = JobLog::attach(file, &job.log_path(), &job.to_string());
        debug!("Attached job log {}", log.path().display());
        log.info(&format!(
            "Running command for {} with config '{}': {}",
            job.group.name, job.configuration.output_label, command
        ));

        match self.launcher.launch(&command).await {
            Ok(output) => {
                record_output(&mut log, &output);
                if output.success() {
                    None
                } else {
                    let reason = match output.exit_code {
                        Some(code) => format!("process exited with code {}", code),
                        None => "process terminated by signal".to_string(),
                    };
                    log.warn(&reason);
                    Some(reason)
                }
            }
            Err(e) => {
                log.error(&e.to_string());
                Some(e.to_string())
            }
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn record_output(log: &mut JobLog, output: &ProcessOutput) {
    log.info(&format!(
        "Process finished in {:.1}s with exit code {:?}",
        output.duration.as_secs_f64(),
        output.exit_code
    ));
    if !output.stdout.is_empty() {
        log.info(output.stdout.trim_end());
    }
    if !output.stderr.is_empty() {
        log.error(output.stderr.trim_end());
    }
}
