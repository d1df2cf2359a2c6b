pub mod collect;
pub mod run;
pub mod schema;

use crate::output::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "expbatch")]
#[command(
    author,
    version,
    about = "Resumable batch orchestrator for leave-one-out training and evaluation runs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose/debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Append the run log to this file (default for `run`: expbatch.log)
    #[arg(long, global = true, env = "EXPBATCH_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dispatch every pending (group, split, configuration) job
    Run(RunArgs),

    /// Collect metrics and images from the output tree
    Collect(CollectArgs),

    /// Print JSON Schema for config validation
    Schema,
}

#[derive(Parser, Clone)]
pub struct RunArgs {
    /// Path to config file
    #[arg(short, long, default_value = "expbatch.yaml")]
    pub config: PathBuf,

    /// Override number of concurrent jobs
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Override output directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Override the step budget passed to the program
    #[arg(long)]
    pub n_steps: Option<u64>,

    /// Run specific dataset groups only (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub groups: Option<Vec<String>>,

    /// Run specific configurations only (comma-separated ids)
    #[arg(long, value_delimiter = ',')]
    pub configs: Option<Vec<String>>,

    /// Show plan without executing
    #[arg(long)]
    pub dry_run: bool,

    /// Exit 1 if any job or dataset group failed
    #[arg(long)]
    pub strict: bool,
}

#[derive(Parser, Clone)]
pub struct CollectArgs {
    /// Config file (for output directory, configuration titles and metric)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output tree to walk (overrides the config)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Make image paths relative to this directory
    #[arg(long)]
    pub web_root: Option<PathBuf>,

    /// Serialization format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}
