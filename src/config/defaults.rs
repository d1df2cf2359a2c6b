use std::path::PathBuf;

pub fn default_root() -> PathBuf {
    PathBuf::from(".")
}

pub fn default_group_pattern() -> String {
    "painting_*".to_string()
}

pub fn default_split_source() -> String {
    "transforms_tight".to_string()
}

pub fn default_split_subdir() -> String {
    "leave_one_out".to_string()
}

pub fn default_n_steps() -> u64 {
    35000
}

pub fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

pub fn default_snapshot_ext() -> String {
    "ingp".to_string()
}

pub fn default_concurrency() -> usize {
    1
}

pub fn default_metric_name() -> String {
    "psnr".to_string()
}

pub fn default_metric_pattern() -> String {
    r"PSNR=([0-9]+(?:\.[0-9]+)?)".to_string()
}
