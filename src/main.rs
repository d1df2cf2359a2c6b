use clap::Parser;
use std::path::PathBuf;

mod aggregate;
mod cli;
mod config;
mod discovery;
mod error;
mod launcher;
mod logging;
mod output;
mod runner;

use cli::{Cli, Commands};

const DEFAULT_RUN_LOG: &str = "expbatch.log";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Batch runs always keep a run-level log next to the console output
    let log_file = match (&cli.log_file, &cli.command) {
        (Some(path), _) => Some(path.clone()),
        (None, Commands::Run(args)) if !args.dry_run => Some(PathBuf::from(DEFAULT_RUN_LOG)),
        _ => None,
    };
    logging::init(cli.verbose, log_file.as_deref())?;

    match cli.command {
        Commands::Run(args) => cli::run::execute(args).await,
        Commands::Collect(args) => cli::collect::execute(args),
        Commands::Schema => cli::schema::execute(),
    }
}
