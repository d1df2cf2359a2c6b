use super::DatasetGroup;
use crate::error::DiscoveryError;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

const TRAIN_PREFIX: &str = "train_leave_";
const TEST_PREFIX: &str = "test_leave_";

/// One train/test file pair from a leave-one-out split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPair {
    pub index: u32,
    pub train: PathBuf,
    pub test: PathBuf,
}

impl SplitPair {
    /// Job name shared by every configuration run on this pair
    pub fn job_name(&self) -> String {
        format!(
            "{}{}_vs_{}{}",
            TRAIN_PREFIX, self.index, TEST_PREFIX, self.index
        )
    }
}

/// List the split pairs of a group, sorted by index.
///
/// A group without `<split_source>/<split_subdir>` has no splits; that is
/// not an error.
pub fn discover_splits(
    group: &DatasetGroup,
    split_source: &str,
    split_subdir: &str,
) -> Result<Vec<SplitPair>, DiscoveryError> {
    let dir = group.root.join(split_source).join(split_subdir);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut train: BTreeMap<u32, PathBuf> = BTreeMap::new();
    let mut test: BTreeMap<u32, PathBuf> = BTreeMap::new();

    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        let (side, text) = if let Some(text) = index_text(&name, TRAIN_PREFIX) {
            (&mut train, text)
        } else if let Some(text) = index_text(&name, TEST_PREFIX) {
            (&mut test, text)
        } else {
            continue;
        };

        let index = canonical_index(text).ok_or_else(|| DiscoveryError::SplitIndexInvalid {
            group: group.name.clone(),
            file: name.clone(),
        })?;
        side.insert(index, entry.path());
    }

    if train.len() != test.len() {
        return Err(DiscoveryError::SplitMismatch {
            group: group.name.clone(),
            train: train.len(),
            test: test.len(),
        });
    }

    let mut pairs = Vec::with_capacity(train.len());
    for (index, train_file) in train {
        let test_file = test
            .remove(&index)
            .ok_or_else(|| DiscoveryError::SplitIndexMismatch {
                group: group.name.clone(),
                index,
            })?;
        pairs.push(SplitPair {
            index,
            train: train_file,
            test: test_file,
        });
    }

    Ok(pairs)
}

fn index_text<'a>(file_name: &'a str, prefix: &str) -> Option<&'a str> {
    file_name.strip_prefix(prefix)?.strip_suffix(".json")
}

/// `01` or `+1` would alias split `1`
fn canonical_index(text: &str) -> Option<u32> {
    let index: u32 = text.parse().ok()?;
    (index.to_string() == text).then_some(index)
}
