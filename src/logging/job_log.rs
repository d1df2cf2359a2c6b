use chrono::Local;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn, Level};

/// Job-scoped log sink.
///
/// Every line is written to the job's own file and mirrored to the
/// process-wide `tracing` subscriber with a `job` field. The file is flushed
/// and closed when the handle is dropped, which also happens while
/// unwinding, so a job's log never receives lines from another job.
pub struct JobLog {
    job: String,
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JobLog {
    /// Wrap a file the caller already opened, typically by exclusive create
    pub fn attach(file: File, path: &Path, job: &str) -> Self {
        Self {
            job: job.to_string(),
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&mut self, message: &str) {
        info!(job = %self.job, "{}", message);
        self.write_line(Level::INFO, message);
    }

    pub fn warn(&mut self, message: &str) {
        warn!(job = %self.job, "{}", message);
        self.write_line(Level::WARN, message);
    }

    pub fn error(&mut self, message: &str) {
        error!(job = %self.job, "{}", message);
        self.write_line(Level::ERROR, message);
    }

    fn write_line(&mut self, level: Level, message: &str) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S,%3f");
        if let Err(e) = writeln!(self.writer, "{} - {} - {}", timestamp, level, message) {
            warn!("Failed to write job log {}: {}", self.path.display(), e);
        }
    }
}

impl Drop for JobLog {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!("Failed to flush job log {}: {}", self.path.display(), e);
        }
    }
}
