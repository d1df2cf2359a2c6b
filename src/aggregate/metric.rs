use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::debug;

/// First value captured by `pattern` in `text`
pub fn extract_metric(text: &str, pattern: &Regex) -> Option<f64> {
    pattern
        .captures_iter(text)
        .find_map(|cap| cap.get(1)?.as_str().parse::<f64>().ok())
}

/// Read a job log and extract its metric. A missing or unreadable log
/// yields `None`.
pub fn read_metric(log_path: &Path, pattern: &Regex) -> Option<f64> {
    match fs::read(log_path) {
        Ok(bytes) => extract_metric(&String::from_utf8_lossy(&bytes), pattern),
        Err(e) => {
            debug!("No metric from {}: {}", log_path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricConfig;
    use tempfile::TempDir;

    fn psnr() -> Regex {
        Regex::new(&MetricConfig::default().pattern).unwrap()
    }

    #[test]
    fn test_extracts_metric() {
        let log = "2024-01-01 - INFO - step 1000\n2024-01-01 - INFO - PSNR=28.75 SSIM=0.9\n";
        assert_eq!(extract_metric(log, &psnr()), Some(28.75));
    }

    #[test]
    fn test_first_evaluation_is_reported() {
        let log = "x - INFO - step 100\nx - INFO - PSNR=20.0\nx - INFO - step 200\nx - INFO - PSNR=31.5\n";
        assert_eq!(extract_metric(log, &psnr()), Some(20.0));
    }

    #[test]
    fn test_no_match_is_none() {
        assert_eq!(extract_metric("training finished", &psnr()), None);
    }

    #[test]
    fn test_missing_log_is_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_metric(&dir.path().join("experiment.log"), &psnr()), None);
    }
}
