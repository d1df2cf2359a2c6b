use super::job::JOB_LOG_FILE;
use crate::error::DispatchError;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::Path;

/// A job is complete iff its output directory exists and has at least one
/// entry. A partially written directory also counts; delete it to force a
/// re-run.
pub fn is_complete(output_dir: &Path) -> bool {
    match fs::read_dir(output_dir) {
        Ok(mut entries) => entries.next().is_some(),
        Err(_) => false,
    }
}

#[derive(Debug)]
pub enum Claim {
    /// This worker owns the job; the job log was created exclusively
    Claimed(File),
    /// Another worker created the job log first
    Taken,
}

/// Create the output directory and exclusively create the job log inside it.
///
/// The first writer wins, so two workers can never both dispatch the same
/// job. An existing empty directory is reused.
pub fn claim(output_dir: &Path) -> Result<Claim, DispatchError> {
    fs::create_dir_all(output_dir).map_err(|e| DispatchError::CreateDir {
        path: output_dir.to_path_buf(),
        source: e,
    })?;

    let log_path = output_dir.join(JOB_LOG_FILE);
    match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&log_path)
    {
        Ok(file) => Ok(Claim::Claimed(file)),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(Claim::Taken),
        Err(e) => Err(DispatchError::OpenLog {
            path: log_path,
            source: e,
        }),
    }
}
