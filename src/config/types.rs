use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::defaults::*;

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct Config {
    /// Base directory that relative paths are resolved against
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// External training/evaluation executable
    pub program: PathBuf,

    /// Arguments placed before the config file (e.g. the script for an interpreter)
    #[serde(default)]
    pub program_args: Vec<String>,

    pub datasets_dir: PathBuf,

    #[serde(default = "default_group_pattern")]
    pub group_pattern: String,

    #[serde(default = "default_split_source")]
    pub split_source: String,

    #[serde(default = "default_split_subdir")]
    pub split_subdir: String,

    #[serde(default = "default_n_steps")]
    pub n_steps: u64,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_snapshot_ext")]
    pub snapshot_ext: String,

    #[serde(default)]
    pub flag_style: FlagStyle,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default)]
    pub on_failure: FailurePolicy,

    #[serde(default)]
    pub metric: MetricConfig,

    #[serde(default)]
    pub configurations: Vec<Configuration>,
}

/// A named variant of the external program's settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct Configuration {
    pub id: String,

    /// Config file passed to the program; absent means program defaults
    #[serde(default)]
    pub config_file: Option<PathBuf>,

    pub output_label: String,

    /// Label shown for this configuration in collected results
    #[serde(default)]
    pub title: Option<String>,
}

impl Configuration {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FlagStyle {
    /// `--n-steps`
    #[default]
    Kebab,
    /// `--n_steps`
    Snake,
}

impl FlagStyle {
    pub fn flag(&self, name: &str) -> String {
        match self {
            FlagStyle::Kebab => format!("--{}", name.replace('_', "-")),
            FlagStyle::Snake => format!("--{}", name.replace('-', "_")),
        }
    }
}

/// What happens to a job's output directory when the program fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Remove the directory so the next run retries the job
    #[default]
    Discard,
    /// Leave the directory; the job counts as attempted
    Keep,
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::Discard => write!(f, "discard"),
            FailurePolicy::Keep => write!(f, "keep"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct MetricConfig {
    #[serde(default = "default_metric_name")]
    pub name: String,

    /// Regex whose first capture group is the metric value
    #[serde(default = "default_metric_pattern")]
    pub pattern: String,
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self {
            name: default_metric_name(),
            pattern: default_metric_pattern(),
        }
    }
}
