use crate::cli::RunArgs;
use crate::config::Config;
use crate::launcher::ProcessLauncher;
use crate::runner::{build_command, is_complete, BatchPlan, JobStatus, Orchestrator, RunOptions};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub async fn execute(args: RunArgs) -> anyhow::Result<()> {
    info!("Loading config from {:?}", args.config);
    let mut config = Config::load(&args.config)?;

    // Apply CLI overrides
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(n_steps) = args.n_steps {
        config.n_steps = n_steps;
    }

    // Child processes run in `root`, so every path handed to them is absolute
    config.root = std::env::current_dir()?.join(&config.root);

    let options = RunOptions {
        group_filter: args.groups,
        config_filter: args.configs,
    };

    let launcher = Arc::new(ProcessLauncher::new(Some(config.root.clone())));
    let orchestrator = Orchestrator::new(config.clone(), launcher);

    if args.dry_run {
        info!("DRY RUN - no jobs will be dispatched");
        let plan = orchestrator.plan(&options)?;
        print_execution_plan(&config, &plan);
        return Ok(());
    }

    let report = orchestrator.run(&options).await?;

    for outcome in &report.outcomes {
        match &outcome.status {
            JobStatus::Failed { error, discarded } => warn!(
                "Job {} failed{}: {}",
                outcome.output_dir.display(),
                if *discarded { " (output discarded)" } else { "" },
                error
            ),
            status => debug!(
                "{}: {} ({:.1}s)",
                outcome.job,
                status,
                outcome.duration.as_secs_f64()
            ),
        }
    }
    for failure in &report.group_failures {
        error!("Group {} skipped: {}", failure.group, failure.error);
    }

    let counts = report.counts();
    info!(
        run_id = %report.run_id,
        "Finished in {:.1}s: {} dispatched, {} completed, {} skipped, {} failed, {} group errors",
        report.total_duration.as_secs_f64(),
        report.dispatched(),
        counts.completed,
        counts.skipped,
        counts.failed,
        report.group_failures.len()
    );

    if args.strict && (counts.failed > 0 || !report.group_failures.is_empty()) {
        error!("Exiting with error: batch had failures");
        std::process::exit(1);
    }

    Ok(())
}

fn print_execution_plan(config: &Config, plan: &BatchPlan) {
    println!("\n=== Execution Plan ===\n");
    println!("Datasets: {:?}", config.datasets_root());
    println!("Output dir: {:?}", config.output_root());
    println!("Concurrency: {}", config.concurrency);
    println!("On failure: {}", config.on_failure);

    for group in &plan.empty_groups {
        println!("  [SKIP group {} - no splits]", group);
    }
    for failure in &plan.group_failures {
        println!("  [SKIP group {} - {}]", failure.group, failure.error);
    }

    let mut pending = 0;
    println!("\nJobs:");
    for job in &plan.jobs {
        if is_complete(&job.output_dir) {
            println!("  - {} [SKIP - output exists]", job);
        } else {
            pending += 1;
            println!("  - {}", job);
            println!("      {}", build_command(config, job));
        }
    }
    println!(
        "\n{} jobs, {} pending, {} already complete\n",
        plan.jobs.len(),
        pending,
        plan.jobs.len() - pending
    );
}
