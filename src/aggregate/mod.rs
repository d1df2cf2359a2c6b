//! Read-only pass over the output tree.
//!
//! Walks `<output-root>/<label>/<group>/<job>/`, extracts the metric from
//! each job log and groups results by dataset group, split index and
//! configuration. Safe to run while a batch is still in progress.

mod metric;
mod presentation;

pub use presentation::Presentation;

use crate::config::{Config, Configuration};
use crate::error::{AggregateError, ConfigError};
use crate::runner::JOB_LOG_FILE;
use metric::read_metric;
use presentation::{group_title, split_title, Entry, GroupView, SplitView};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

pub const REF_IMAGE: &str = "ref.png";
pub const OUT_IMAGE: &str = "out.png";

/// An output label and the title it is presented under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub label: String,
    pub title: String,
}

impl From<&Configuration> for Source {
    fn from(configuration: &Configuration) -> Self {
        Self {
            label: configuration.output_label.clone(),
            title: configuration.display_title().to_string(),
        }
    }
}

/// What one job directory contributed
#[derive(Debug, Clone, PartialEq)]
pub struct JobResult {
    pub group: String,
    pub index: u32,
    pub label: String,
    pub metric: Option<f64>,
    pub ref_image: Option<PathBuf>,
    pub out_image: Option<PathBuf>,
}

pub struct Aggregator {
    output_root: PathBuf,
    sources: Vec<Source>,
    metric: Regex,
    web_root: Option<PathBuf>,
}

impl Aggregator {
    pub fn new(
        output_root: PathBuf,
        sources: Vec<Source>,
        metric: Regex,
        web_root: Option<PathBuf>,
    ) -> Self {
        Self {
            output_root,
            sources,
            metric,
            web_root,
        }
    }

    pub fn from_config(config: &Config, web_root: Option<PathBuf>) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.output_root(),
            config.configurations.iter().map(Source::from).collect(),
            config.metric_regex()?,
            web_root,
        ))
    }

    /// Every job directory currently present, in walk order
    pub fn collect(&self) -> Result<Vec<JobResult>, AggregateError> {
        if !self.output_root.is_dir() {
            return Err(AggregateError::OutputRootMissing(self.output_root.clone()));
        }

        let mut results = Vec::new();
        for (label, label_dir) in subdirs(&self.output_root)? {
            for (group, group_dir) in subdirs(&label_dir)? {
                for (job, job_dir) in subdirs(&group_dir)? {
                    let Some(index) = parse_job_index(&job) else {
                        debug!("Ignoring {}", job_dir.display());
                        continue;
                    };

                    results.push(JobResult {
                        group: group.clone(),
                        index,
                        label: label.clone(),
                        metric: read_metric(&job_dir.join(JOB_LOG_FILE), &self.metric),
                        ref_image: existing(job_dir.join(REF_IMAGE)),
                        out_image: existing(job_dir.join(OUT_IMAGE)),
                    });
                }
            }
        }

        Ok(results)
    }

    pub fn presentation(&self) -> Result<Presentation, AggregateError> {
        Ok(self.build(self.collect()?))
    }

    /// Group by dataset group (name order), split (index order) and source
    /// (declared order, undeclared labels last by name)
    pub fn build(&self, results: Vec<JobResult>) -> Presentation {
        let mut tree: BTreeMap<String, BTreeMap<u32, Vec<JobResult>>> = BTreeMap::new();
        for result in results {
            tree.entry(result.group.clone())
                .or_default()
                .entry(result.index)
                .or_default()
                .push(result);
        }

        let groups = tree
            .into_iter()
            .map(|(name, splits)| GroupView {
                title: group_title(&name),
                name,
                splits: splits
                    .into_iter()
                    .map(|(index, mut results)| {
                        results.sort_by_key(|r| self.source_rank(&r.label));
                        SplitView {
                            index,
                            title: split_title(index),
                            entries: results.iter().map(|r| self.entry(r)).collect(),
                        }
                    })
                    .collect(),
            })
            .collect();

        Presentation { groups }
    }

    fn source_rank(&self, label: &str) -> (usize, String) {
        let position = self
            .sources
            .iter()
            .position(|s| s.label == label)
            .unwrap_or(self.sources.len());
        (position, label.to_string())
    }

    fn entry(&self, result: &JobResult) -> Entry {
        let source_label = self
            .sources
            .iter()
            .find(|s| s.label == result.label)
            .map(|s| s.title.clone())
            .unwrap_or_else(|| result.label.clone());

        Entry {
            source_label,
            metric: result.metric,
            ref_image: result.ref_image.as_deref().map(|p| self.web_path(p)),
            out_image: result.out_image.as_deref().map(|p| self.web_path(p)),
        }
    }

    fn web_path(&self, path: &Path) -> String {
        let relative = match self.web_root.as_deref() {
            Some(root) => relative_to(path, root).unwrap_or_else(|e| {
                debug!("Cannot relativize {}: {}", path.display(), e);
                path.to_path_buf()
            }),
            None => path.to_path_buf(),
        };
        relative.to_string_lossy().replace('\\', "/")
    }
}

/// `path` relative to `base`, stepping up with `..` where they diverge.
/// Both are made absolute against the working directory and normalized
/// lexically; symlinks are not resolved.
fn relative_to(path: &Path, base: &Path) -> io::Result<PathBuf> {
    let absolute_path = std::path::absolute(path)?;
    let absolute_base = std::path::absolute(base)?;
    let path = normalize(&absolute_path);
    let base = normalize(&absolute_base);

    let common = path
        .iter()
        .zip(&base)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base.len() {
        relative.push("..");
    }
    for component in &path[common..] {
        relative.push(component);
    }
    Ok(relative)
}

fn normalize(path: &Path) -> Vec<Component<'_>> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            // `..` at the root stays at the root
            Component::ParentDir => {
                if matches!(parts.last(), Some(Component::Normal(_))) {
                    parts.pop();
                } else if parts.is_empty() {
                    parts.push(component);
                }
            }
            other => parts.push(other),
        }
    }
    parts
}

/// Subdirectories sorted by name. A directory that vanished mid-walk (e.g.
/// a failed job being discarded) is treated as empty.
fn subdirs(dir: &Path) -> Result<Vec<(String, PathBuf)>, AggregateError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.path().is_dir() {
            dirs.push((entry.file_name().to_string_lossy().to_string(), entry.path()));
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Train index of a `train_leave_<i>_vs_test_leave_<j>` directory
fn parse_job_index(name: &str) -> Option<u32> {
    let rest = name.strip_prefix("train_leave_")?;
    let (train, test) = rest.split_once("_vs_test_leave_")?;
    test.parse::<u32>().ok()?;
    train.parse().ok()
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}
