use crate::config::Configuration;
use crate::discovery::{DatasetGroup, SplitPair};
use std::fmt;
use std::path::{Path, PathBuf};

pub const JOB_LOG_FILE: &str = "experiment.log";
const SNAPSHOT_STEM: &str = "model";

/// One (group, split, configuration) unit of work.
///
/// Every derived path is a pure function of the triple and the output root,
/// so a resumed run computes the same directory for the same logical job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    pub group: DatasetGroup,
    pub split: SplitPair,
    pub configuration: Configuration,
    pub output_dir: PathBuf,
    pub snapshot_path: PathBuf,
}

impl JobDescriptor {
    pub fn new(
        output_root: &Path,
        snapshot_ext: &str,
        group: &DatasetGroup,
        split: &SplitPair,
        configuration: &Configuration,
    ) -> Self {
        let output_dir = output_root
            .join(&configuration.output_label)
            .join(&group.name)
            .join(split.job_name());
        let snapshot_path = output_dir.join(format!("{}.{}", SNAPSHOT_STEM, snapshot_ext));

        Self {
            group: group.clone(),
            split: split.clone(),
            configuration: configuration.clone(),
            output_dir,
            snapshot_path,
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.output_dir.join(JOB_LOG_FILE)
    }
}

impl fmt::Display for JobDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.configuration.output_label,
            self.group.name,
            self.split.job_name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_derived_from_triple() {
        let group = DatasetGroup {
            name: "painting_1".to_string(),
            root: PathBuf::from("/data/painting_1"),
        };
        let split = SplitPair {
            index: 4,
            train: PathBuf::from("/data/painting_1/t/loo/train_leave_4.json"),
            test: PathBuf::from("/data/painting_1/t/loo/test_leave_4.json"),
        };
        let configuration = Configuration {
            id: "reduced".to_string(),
            config_file: None,
            output_label: "output_reduced".to_string(),
            title: None,
        };

        let job = JobDescriptor::new(Path::new("/out"), "ingp", &group, &split, &configuration);
        let again = JobDescriptor::new(Path::new("/out"), "ingp", &group, &split, &configuration);

        assert_eq!(job, again);
        assert_eq!(
            job.output_dir,
            PathBuf::from("/out/output_reduced/painting_1/train_leave_4_vs_test_leave_4")
        );
        assert_eq!(job.snapshot_path, job.output_dir.join("model.ingp"));
        assert_eq!(job.log_path(), job.output_dir.join("experiment.log"));
        assert_eq!(
            job.to_string(),
            "output_reduced/painting_1/train_leave_4_vs_test_leave_4"
        );
    }
}
