//! Durable per-run event log.
//!
//! Each entry is appended to `logfile.log` as `TIMESTAMP - LEVEL - MESSAGE` and
//! mirrored to the `log` facade, which the binary renders on the console.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};

use crate::models::now_timestamp;

/// `log` target of mirrored entries.
pub const LOG_TARGET: &str = "profile_watcher::run";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLevel {
    Info,
    Warning,
    Error,
}

impl RunLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunLevel::Info => "INFO",
            RunLevel::Warning => "WARNING",
            RunLevel::Error => "ERROR",
        }
    }
}

impl From<RunLevel> for log::Level {
    fn from(level: RunLevel) -> Self {
        match level {
            RunLevel::Info => log::Level::Info,
            RunLevel::Warning => log::Level::Warn,
            RunLevel::Error => log::Level::Error,
        }
    }
}

#[derive(Clone)]
pub struct RunLog {
    path: Arc<PathBuf>,
    file: Arc<Mutex<File>>,
}

impl RunLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open run log {}", path.display()))?;

        Ok(Self {
            path: Arc::new(path),
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.record(RunLevel::Info, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.record(RunLevel::Warning, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.record(RunLevel::Error, message.as_ref());
    }

    /// Appends one entry. A failed write is reported on the console only.
    pub fn record(&self, level: RunLevel, message: &str) {
        let line = format!("{} - {} - {}\n", now_timestamp(), level.as_str(), message);

        let written = match self.file.lock() {
            Ok(mut file) => file.write_all(line.as_bytes()).and_then(|_| file.flush()),
            Err(poisoned) => {
                let mut file = poisoned.into_inner();
                file.write_all(line.as_bytes()).and_then(|_| file.flush())
            }
        };
        if let Err(err) = written {
            log::error!("Failed to append to run log {}: {err}", self.path.display());
        }

        let level: log::Level = level.into();
        log::log!(target: LOG_TARGET, level, "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{run_error, run_info, run_warn};

    #[test]
    fn appends_leveled_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::open(dir.path().join("logfile.log")).unwrap();

        log.info("started");
        run_warn!(log, "photo missing for {}", "someone");
        run_error!(log, "cycle {} failed", 3);
        run_info!(log, "done");

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with(" - INFO - started"));
        assert!(lines[1].ends_with(" - WARNING - photo missing for someone"));
        assert!(lines[2].ends_with(" - ERROR - cycle 3 failed"));

        let stamp = lines[0].split(" - ").next().unwrap();
        assert_eq!(stamp.len(), "YYYY-MM-DD-HH-MM-SS".len());
    }

    #[test]
    fn reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logfile.log");

        RunLog::open(&path).unwrap().info("first");
        let clone = RunLog::open(&path).unwrap();
        clone.clone().info("second");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
