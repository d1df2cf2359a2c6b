use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("No configurations declared")]
    NoConfigurations,

    #[error("Configuration '{0}' is declared more than once")]
    DuplicateConfiguration(String),

    #[error("Output label '{0}' is used by more than one configuration")]
    DuplicateOutputLabel(String),

    #[error("Config file for configuration '{id}' does not exist: {path}")]
    MissingConfigFile { id: String, path: PathBuf },

    #[error("Invalid group pattern '{pattern}': {source}")]
    GroupPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Invalid metric pattern '{pattern}': {source}")]
    MetricPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Metric pattern '{0}' has no capture group")]
    MetricCapture(String),

    #[error("Unknown configuration '{0}' in filter")]
    UnknownConfiguration(String),
}

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Dataset directory does not exist: {0}")]
    BaseDirMissing(PathBuf),

    #[error("Mismatch between train ({train}) and test ({test}) files in {group}")]
    SplitMismatch {
        group: String,
        train: usize,
        test: usize,
    },

    #[error("Train file for split {index} in {group} has no matching test file")]
    SplitIndexMismatch { group: String, index: u32 },

    #[error("Split file {file} in {group} has a non-canonical index")]
    SplitIndexInvalid { group: String, file: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiscoveryError {
    /// Errors that only invalidate one dataset group, never the whole batch
    pub fn is_group_scoped(&self) -> bool {
        matches!(
            self,
            DiscoveryError::SplitMismatch { .. }
                | DiscoveryError::SplitIndexMismatch { .. }
                | DiscoveryError::SplitIndexInvalid { .. }
                | DiscoveryError::Io(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Failed to create output directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to open job log '{path}': {source}")]
    OpenLog {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Failed to acquire worker slot: {0}")]
    Semaphore(#[from] tokio::sync::AcquireError),
}

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Output directory does not exist: {0}")]
    OutputRootMissing(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to create output directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Failed to write results: {0}")]
    Write(std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
