use crate::config::Config;
use crate::discovery::{discover_groups, discover_splits};
use crate::error::BatchError;
use crate::launcher::Launcher;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::dispatcher::{panic_message, Dispatcher, JobOutcome, JobStatus};
use super::job::JobDescriptor;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub group_filter: Option<Vec<String>>,
    pub config_filter: Option<Vec<String>>,
}

/// A dataset group that was dropped from the batch
#[derive(Debug, Clone)]
pub struct GroupFailure {
    pub group: String,
    pub error: String,
}

/// Jobs in dispatch order: group (by name), split (by index), configuration
/// (declared order)
#[derive(Debug)]
pub struct BatchPlan {
    pub jobs: Vec<JobDescriptor>,
    pub empty_groups: Vec<String>,
    pub group_failures: Vec<GroupFailure>,
}

#[derive(Debug)]
pub struct BatchReport {
    pub run_id: String,
    pub outcomes: Vec<JobOutcome>,
    pub group_failures: Vec<GroupFailure>,
    pub total_duration: Duration,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for outcome in &self.outcomes {
            match outcome.status {
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Skipped { .. } => counts.skipped += 1,
                JobStatus::Failed { .. } => counts.failed += 1,
            }
        }
        counts
    }

    /// Number of jobs for which the external program was started (or tried)
    pub fn dispatched(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status.was_dispatched())
            .count()
    }
}

pub struct Orchestrator {
    config: Arc<Config>,
    dispatcher: Arc<Dispatcher>,
}

impl Orchestrator {
    pub fn new(config: Config, launcher: Arc<dyn Launcher>) -> Self {
        let config = Arc::new(config);
        let dispatcher = Arc::new(Dispatcher::new(config.clone(), launcher));
        Self { config, dispatcher }
    }

    /// Validate configurations and enumerate every job, touching nothing
    /// under the output root.
    pub fn plan(&self, options: &RunOptions) -> Result<BatchPlan, BatchError> {
        self.config.validate()?;
        let configurations = self
            .config
            .select_configurations(options.config_filter.as_deref())?;
        let matcher = self.config.group_matcher()?;
        let output_root = self.config.output_root();

        let groups = discover_groups(&self.config.datasets_root(), &matcher)?;
        if let Some(filter) = &options.group_filter {
            for name in filter {
                if !groups.iter().any(|g| &g.name == name) {
                    warn!("Group '{}' not found, ignoring", name);
                }
            }
        }

        let mut plan = BatchPlan {
            jobs: Vec::new(),
            empty_groups: Vec::new(),
            group_failures: Vec::new(),
        };

        for group in &groups {
            if let Some(filter) = &options.group_filter {
                if !filter.contains(&group.name) {
                    continue;
                }
            }

            let splits = match discover_splits(
                group,
                &self.config.split_source,
                &self.config.split_subdir,
            ) {
                Ok(splits) => splits,
                Err(e) if e.is_group_scoped() => {
                    error!("Skipping group {}: {}", group.name, e);
                    plan.group_failures.push(GroupFailure {
                        group: group.name.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if splits.is_empty() {
                info!("Skipping {}: no splits", group.root.display());
                plan.empty_groups.push(group.name.clone());
                continue;
            }

            for split in &splits {
                for configuration in &configurations {
                    plan.jobs.push(JobDescriptor::new(
                        &output_root,
                        &self.config.snapshot_ext,
                        group,
                        split,
                        configuration,
                    ));
                }
            }
        }

        Ok(plan)
    }

    pub async fn run(&self, options: &RunOptions) -> Result<BatchReport, BatchError> {
        let start = Instant::now();
        let run_id = Uuid::new_v4().to_string();

        let plan = self.plan(options)?;
        info!(
            run_id = %run_id,
            "Planned {} jobs across {} configurations (concurrency {}, on failure: {})",
            plan.jobs.len(),
            self.config.configurations.len(),
            self.config.concurrency,
            self.config.on_failure
        );

        let outcomes = if self.config.concurrency <= 1 {
            self.run_sequential(&plan.jobs).await
        } else {
            self.run_pool(&plan.jobs).await?
        };

        Ok(BatchReport {
            run_id,
            outcomes,
            group_failures: plan.group_failures,
            total_duration: start.elapsed(),
        })
    }

    async fn run_sequential(&self, jobs: &[JobDescriptor]) -> Vec<JobOutcome> {
        let mut outcomes = Vec::with_capacity(jobs.len());
        for (idx, job) in jobs.iter().enumerate() {
            info!("Processing job {}/{}: {}", idx + 1, jobs.len(), job);
            let outcome = match AssertUnwindSafe(self.dispatcher.dispatch(job))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(panic) => panicked(job, &panic_message(&*panic)),
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Bounded worker pool. Jobs are launched in plan order; outcomes are
    /// returned in plan order regardless of completion order.
    async fn run_pool(&self, jobs: &[JobDescriptor]) -> Result<Vec<JobOutcome>, BatchError> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut futures = FuturesUnordered::new();

        for (idx, job) in jobs.iter().enumerate() {
            let permit = semaphore.clone().acquire_owned().await?;
            info!("Processing job {}/{}: {}", idx + 1, jobs.len(), job);

            let dispatcher = self.dispatcher.clone();
            let job = job.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit; // hold until done
                dispatcher.dispatch(&job).await
            });
            futures.push(async move { (idx, handle.await) });
        }

        let mut outcomes: Vec<(usize, JobOutcome)> = Vec::with_capacity(jobs.len());
        while let Some((idx, result)) = futures.next().await {
            match result {
                Ok(outcome) => outcomes.push((idx, outcome)),
                Err(e) => {
                    let message = if e.is_panic() {
                        panic_message(&*e.into_panic())
                    } else {
                        e.to_string()
                    };
                    outcomes.push((idx, panicked(&jobs[idx], &message)));
                }
            }
        }

        outcomes.sort_by_key(|(idx, _)| *idx);
        Ok(outcomes.into_iter().map(|(_, outcome)| outcome).collect())
    }
}

/// Outcome for a dispatch that unwound before it could report. Whether the
/// claim was taken is unknown, so the directory is left alone.
fn panicked(job: &JobDescriptor, message: &str) -> JobOutcome {
    warn!("Job {} panicked: {}", job, message);
    JobOutcome {
        job: job.to_string(),
        output_dir: job.output_dir.clone(),
        status: JobStatus::Failed {
            error: format!("job panicked: {}", message),
            discarded: false,
        },
        duration: Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, DispatchError};
    use crate::launcher::{JobCommand, ProcessOutput};
    use async_trait::async_trait;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records every command and writes a file into the output directory,
    /// the way the real program would.
    #[derive(Default)]
    struct RecordingLauncher {
        commands: Mutex<Vec<JobCommand>>,
    }

    impl RecordingLauncher {
        fn output_dirs(&self) -> Vec<PathBuf> {
            self.commands
                .lock()
                .unwrap()
                .iter()
                .map(|c| {
                    let pos = c.args.iter().position(|a| a == "--output-dir").unwrap();
                    PathBuf::from(&c.args[pos + 1])
                })
                .collect()
        }

        fn count(&self) -> usize {
            self.commands.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Launcher for RecordingLauncher {
        async fn launch(&self, command: &JobCommand) -> Result<ProcessOutput, DispatchError> {
            self.commands.lock().unwrap().push(command.clone());
            let pos = command
                .args
                .iter()
                .position(|a| a == "--output-dir")
                .unwrap();
            let out = PathBuf::from(&command.args[pos + 1]);
            fs::write(out.join("out.png"), "png").unwrap();
            Ok(ProcessOutput {
                stdout: "PSNR=31.0".to_string(),
                stderr: String::new(),
                exit_code: Some(0),
                duration: Duration::ZERO,
            })
        }
    }

    fn write_splits(root: &Path, group: &str, train: &[u32], test: &[u32]) {
        let dir = root
            .join("datasets")
            .join(group)
            .join("transforms_tight/leave_one_out");
        fs::create_dir_all(&dir).unwrap();
        for i in train {
            fs::write(dir.join(format!("train_leave_{}.json", i)), "{}").unwrap();
        }
        for i in test {
            fs::write(dir.join(format!("test_leave_{}.json", i)), "{}").unwrap();
        }
    }

    fn config(root: &Path, concurrency: usize) -> Config {
        serde_yaml::from_str(&format!(
            r#"
root: {}
program: train
datasets_dir: datasets
output_dir: results
concurrency: {}
configurations:
  - id: A
    output_label: out_a
  - id: B
    output_label: out_b
"#,
            root.display(),
            concurrency
        ))
        .unwrap()
    }

    fn relative(root: &Path, dirs: &[PathBuf]) -> Vec<String> {
        dirs.iter()
            .map(|d| {
                d.strip_prefix(root.join("results"))
                    .unwrap()
                    .display()
                    .to_string()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_clean_run_order_and_resume() {
        let dir = TempDir::new().unwrap();
        write_splits(dir.path(), "painting_1", &[0, 1, 2], &[0, 1, 2]);

        let launcher = Arc::new(RecordingLauncher::default());
        let orchestrator = Orchestrator::new(config(dir.path(), 1), launcher.clone());

        let report = orchestrator.run(&RunOptions::default()).await.unwrap();
        assert_eq!(report.dispatched(), 6);
        assert_eq!(
            relative(dir.path(), &launcher.output_dirs()),
            vec![
                "out_a/painting_1/train_leave_0_vs_test_leave_0",
                "out_b/painting_1/train_leave_0_vs_test_leave_0",
                "out_a/painting_1/train_leave_1_vs_test_leave_1",
                "out_b/painting_1/train_leave_1_vs_test_leave_1",
                "out_a/painting_1/train_leave_2_vs_test_leave_2",
                "out_b/painting_1/train_leave_2_vs_test_leave_2",
            ]
        );

        // second run over unchanged inputs dispatches nothing
        let report = orchestrator.run(&RunOptions::default()).await.unwrap();
        assert_eq!(report.dispatched(), 0);
        assert_eq!(report.counts().skipped, 6);
        assert_eq!(launcher.count(), 6);

        // deleting one job directory re-dispatches exactly that job
        let removed = dir
            .path()
            .join("results/out_a/painting_1/train_leave_1_vs_test_leave_1");
        fs::remove_dir_all(&removed).unwrap();
        let report = orchestrator.run(&RunOptions::default()).await.unwrap();
        assert_eq!(report.dispatched(), 1);
        assert_eq!(launcher.output_dirs().last().unwrap(), &removed);
    }

    #[test]
    fn test_plan_is_deterministic() {
        let dir = TempDir::new().unwrap();
        write_splits(dir.path(), "painting_2", &[0, 1], &[0, 1]);
        write_splits(dir.path(), "painting_1", &[0], &[0]);

        let orchestrator = Orchestrator::new(
            config(dir.path(), 1),
            Arc::new(RecordingLauncher::default()),
        );
        let first = orchestrator.plan(&RunOptions::default()).unwrap();
        let second = orchestrator.plan(&RunOptions::default()).unwrap();

        assert_eq!(first.jobs, second.jobs);
        assert_eq!(first.jobs.len(), 6);
        assert_eq!(first.jobs[0].group.name, "painting_1");
        assert_eq!(first.jobs[2].group.name, "painting_2");
        assert!(!dir.path().join("results").exists());
    }

    #[tokio::test]
    async fn test_split_mismatch_is_isolated_to_group() {
        let dir = TempDir::new().unwrap();
        write_splits(dir.path(), "painting_1", &[0, 1], &[0]);
        write_splits(dir.path(), "painting_2", &[0], &[0]);

        let launcher = Arc::new(RecordingLauncher::default());
        let orchestrator = Orchestrator::new(config(dir.path(), 1), launcher.clone());

        let report = orchestrator.run(&RunOptions::default()).await.unwrap();
        assert_eq!(report.group_failures.len(), 1);
        assert_eq!(report.group_failures[0].group, "painting_1");
        assert_eq!(report.counts().completed, 2);
        assert!(launcher
            .output_dirs()
            .iter()
            .all(|d| d.to_string_lossy().contains("painting_2")));
    }

    #[tokio::test]
    async fn test_missing_config_file_fails_before_dispatch() {
        let dir = TempDir::new().unwrap();
        write_splits(dir.path(), "painting_1", &[0], &[0]);
        let mut config = config(dir.path(), 1);
        config.configurations[1].config_file = Some(PathBuf::from("configs/missing.json"));

        let launcher = Arc::new(RecordingLauncher::default());
        let orchestrator = Orchestrator::new(config, launcher.clone());

        let result = orchestrator.run(&RunOptions::default()).await;
        assert!(matches!(
            result,
            Err(BatchError::Config(ConfigError::MissingConfigFile { .. }))
        ));
        assert_eq!(launcher.count(), 0);
        assert!(!dir.path().join("results").exists());
    }

    #[tokio::test]
    async fn test_missing_dataset_dir_is_fatal() {
        let dir = TempDir::new().unwrap();
        let orchestrator = Orchestrator::new(
            config(dir.path(), 1),
            Arc::new(RecordingLauncher::default()),
        );

        assert!(matches!(
            orchestrator.run(&RunOptions::default()).await,
            Err(BatchError::Discovery(_))
        ));
    }

    #[test]
    fn test_group_without_splits_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("datasets/painting_1")).unwrap();
        write_splits(dir.path(), "painting_2", &[0], &[0]);

        let orchestrator = Orchestrator::new(
            config(dir.path(), 1),
            Arc::new(RecordingLauncher::default()),
        );
        let plan = orchestrator.plan(&RunOptions::default()).unwrap();

        assert_eq!(plan.empty_groups, vec!["painting_1".to_string()]);
        assert!(plan.group_failures.is_empty());
        assert_eq!(plan.jobs.len(), 2);
    }

    #[test]
    fn test_filters_preserve_order() {
        let dir = TempDir::new().unwrap();
        write_splits(dir.path(), "painting_1", &[0, 1], &[0, 1]);
        write_splits(dir.path(), "painting_2", &[0], &[0]);

        let orchestrator = Orchestrator::new(
            config(dir.path(), 1),
            Arc::new(RecordingLauncher::default()),
        );
        let options = RunOptions {
            group_filter: Some(vec!["painting_1".to_string()]),
            config_filter: Some(vec!["B".to_string()]),
        };
        let plan = orchestrator.plan(&options).unwrap();

        let names: Vec<_> = plan.jobs.iter().map(|j| j.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "out_b/painting_1/train_leave_0_vs_test_leave_0",
                "out_b/painting_1/train_leave_1_vs_test_leave_1",
            ]
        );
    }

    #[tokio::test]
    async fn test_pool_dispatches_each_job_once_in_plan_order() {
        let dir = TempDir::new().unwrap();
        write_splits(dir.path(), "painting_1", &[0, 1, 2], &[0, 1, 2]);
        write_splits(dir.path(), "painting_2", &[0, 1], &[0, 1]);

        let launcher = Arc::new(RecordingLauncher::default());
        let orchestrator = Orchestrator::new(config(dir.path(), 4), launcher.clone());

        let report = orchestrator.run(&RunOptions::default()).await.unwrap();
        assert_eq!(report.dispatched(), 10);
        assert_eq!(launcher.count(), 10);

        let plan = orchestrator.plan(&RunOptions::default()).unwrap();
        let expected: Vec<_> = plan.jobs.iter().map(|j| j.to_string()).collect();
        let reported: Vec<_> = report.outcomes.iter().map(|o| o.job.clone()).collect();
        assert_eq!(reported, expected);

        let report = orchestrator.run(&RunOptions::default()).await.unwrap();
        assert_eq!(report.dispatched(), 0);
    }

    /// Panics for every job of one output label, records the rest
    struct PanicForLabel {
        label: &'static str,
        inner: RecordingLauncher,
    }

    #[async_trait]
    impl Launcher for PanicForLabel {
        async fn launch(&self, command: &JobCommand) -> Result<ProcessOutput, DispatchError> {
            if command
                .args
                .iter()
                .any(|a| a.to_string_lossy().contains(&format!("/{}/", self.label)))
            {
                panic!("training crashed");
            }
            self.inner.launch(command).await
        }
    }

    #[tokio::test]
    async fn test_uncreatable_output_dir_fails_only_that_job() {
        let dir = TempDir::new().unwrap();
        write_splits(dir.path(), "painting_1", &[0, 1], &[0, 1]);
        fs::create_dir_all(dir.path().join("results/out_a")).unwrap();
        fs::write(dir.path().join("results/out_a/painting_1"), "in the way").unwrap();

        let launcher = Arc::new(RecordingLauncher::default());
        let orchestrator = Orchestrator::new(config(dir.path(), 1), launcher.clone());

        let report = orchestrator.run(&RunOptions::default()).await.unwrap();
        let counts = report.counts();
        assert_eq!(counts.failed, 2);
        assert_eq!(counts.completed, 2);
        assert_eq!(launcher.count(), 2);
        assert!(launcher
            .output_dirs()
            .iter()
            .all(|d| d.to_string_lossy().contains("out_b")));
        for outcome in &report.outcomes {
            if outcome.output_dir.to_string_lossy().contains("out_a") {
                assert!(matches!(
                    outcome.status,
                    JobStatus::Failed { discarded: false, .. }
                ));
            }
        }
    }

    #[tokio::test]
    async fn test_panicking_job_is_failed_and_discarded_in_both_modes() {
        for concurrency in [1, 3] {
            let dir = TempDir::new().unwrap();
            write_splits(dir.path(), "painting_1", &[0, 1], &[0, 1]);

            let launcher = Arc::new(PanicForLabel {
                label: "out_a",
                inner: RecordingLauncher::default(),
            });
            let orchestrator =
                Orchestrator::new(config(dir.path(), concurrency), launcher.clone());

            let report = orchestrator.run(&RunOptions::default()).await.unwrap();
            let counts = report.counts();
            assert_eq!(counts.failed, 2, "concurrency {}", concurrency);
            assert_eq!(counts.completed, 2, "concurrency {}", concurrency);
            assert_eq!(launcher.inner.count(), 2);
            assert!(!dir
                .path()
                .join("results/out_a/painting_1/train_leave_0_vs_test_leave_0")
                .exists());

            // the crashed jobs are retried on resume
            let plan = orchestrator.plan(&RunOptions::default()).unwrap();
            let pending = plan
                .jobs
                .iter()
                .filter(|j| !crate::runner::is_complete(&j.output_dir))
                .count();
            assert_eq!(pending, 2);
        }
    }
}

