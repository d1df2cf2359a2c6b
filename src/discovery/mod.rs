mod splits;

pub use splits::{discover_splits, SplitPair};

use crate::error::DiscoveryError;
use globset::GlobMatcher;
use std::fs;
use std::path::{Path, PathBuf};

/// A scene directory holding one or more split sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetGroup {
    pub name: String,
    pub root: PathBuf,
}

/// Discover dataset groups directly under `base` whose directory name
/// matches `matcher`, sorted by name
pub fn discover_groups(
    base: &Path,
    matcher: &GlobMatcher,
) -> Result<Vec<DatasetGroup>, DiscoveryError> {
    if !base.is_dir() {
        return Err(DiscoveryError::BaseDirMissing(base.to_path_buf()));
    }

    let mut groups = Vec::new();
    for entry in fs::read_dir(base)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if !matcher.is_match(&name) {
            continue;
        }

        groups.push(DatasetGroup {
            name,
            root: entry.path(),
        });
    }

    groups.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(groups)
}
