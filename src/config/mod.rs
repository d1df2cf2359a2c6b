mod defaults;
mod types;

pub use types::*;

use crate::error::ConfigError;
use globset::{Glob, GlobMatcher};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

impl MetricConfig {
    /// Compile the pattern; its first capture group is the metric value
    pub fn regex(&self) -> Result<Regex, ConfigError> {
        let re = Regex::new(&self.pattern).map_err(|e| ConfigError::MetricPattern {
            pattern: self.pattern.clone(),
            source: e,
        })?;
        if re.captures_len() < 2 {
            return Err(ConfigError::MetricCapture(self.pattern.clone()));
        }
        Ok(re)
    }
}

impl Config {
    /// Load config from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Resolve a configured path against `root` unless it is absolute
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn datasets_root(&self) -> PathBuf {
        self.resolve(&self.datasets_dir)
    }

    pub fn output_root(&self) -> PathBuf {
        self.resolve(&self.output_dir)
    }

    pub fn group_matcher(&self) -> Result<GlobMatcher, ConfigError> {
        Glob::new(&self.group_pattern)
            .map(|g| g.compile_matcher())
            .map_err(|e| ConfigError::GroupPattern {
                pattern: self.group_pattern.clone(),
                source: e,
            })
    }

    pub fn metric_regex(&self) -> Result<Regex, ConfigError> {
        self.metric.regex()
    }

    /// Validate the config. Every referenced config file must exist before
    /// any job is dispatched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.configurations.is_empty() {
            return Err(ConfigError::NoConfigurations);
        }

        let mut ids = HashSet::new();
        let mut labels = HashSet::new();
        for configuration in &self.configurations {
            if !ids.insert(configuration.id.as_str()) {
                return Err(ConfigError::DuplicateConfiguration(
                    configuration.id.clone(),
                ));
            }
            if !labels.insert(configuration.output_label.as_str()) {
                return Err(ConfigError::DuplicateOutputLabel(
                    configuration.output_label.clone(),
                ));
            }
        }

        self.group_matcher()?;
        self.metric_regex()?;

        for configuration in &self.configurations {
            if let Some(config_file) = &configuration.config_file {
                let path = self.resolve(config_file);
                if !path.is_file() {
                    return Err(ConfigError::MissingConfigFile {
                        id: configuration.id.clone(),
                        path,
                    });
                }
            }
        }

        Ok(())
    }

    /// Configurations matching `filter`, in declared order
    pub fn select_configurations(
        &self,
        filter: Option<&[String]>,
    ) -> Result<Vec<Configuration>, ConfigError> {
        let Some(filter) = filter else {
            return Ok(self.configurations.clone());
        };

        for id in filter {
            if !self.configurations.iter().any(|c| &c.id == id) {
                return Err(ConfigError::UnknownConfiguration(id.clone()));
            }
        }

        Ok(self
            .configurations
            .iter()
            .filter(|c| filter.contains(&c.id))
            .cloned()
            .collect())
    }
}
