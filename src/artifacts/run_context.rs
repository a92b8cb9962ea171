use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const PAGES_DIR: &str = "profile_pages";
pub const DATA_DIR: &str = "profile_data";
pub const SCREENSHOTS_DIR: &str = "screenshots";
pub const PICTURES_DIR: &str = "profile_pictures";
pub const LOG_FILE: &str = "logfile.log";

pub const SUBDIRECTORIES: [&str; 4] = [PAGES_DIR, DATA_DIR, SCREENSHOTS_DIR, PICTURES_DIR];

/// Directory identity of one process lifetime: `<base>/logs/<run_id>/` with a
/// fixed set of subdirectories and one log file.
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: String,
    root: PathBuf,
}

impl RunContext {
    pub fn create(base_dir: &Path, run_id: impl Into<String>) -> Result<Self> {
        let run_id = run_id.into();
        let root = base_dir.join("logs").join(&run_id);

        for dir in SUBDIRECTORIES {
            let path = root.join(dir);
            std::fs::create_dir_all(&path)
                .with_context(|| format!("failed to create run directory {}", path.display()))?;
        }

        Ok(Self { run_id, root })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.root.join(PAGES_DIR)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        self.root.join(SCREENSHOTS_DIR)
    }

    pub fn pictures_dir(&self) -> PathBuf {
        self.root.join(PICTURES_DIR)
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join(LOG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_fixed_layout() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::create(dir.path(), "2024-01-01-00-00-00").unwrap();

        assert_eq!(ctx.run_id(), "2024-01-01-00-00-00");
        assert_eq!(ctx.root(), dir.path().join("logs/2024-01-01-00-00-00"));
        for sub in SUBDIRECTORIES {
            assert!(ctx.root().join(sub).is_dir(), "{sub} missing");
        }
        assert!(ctx.log_path().ends_with("logfile.log"));
    }

    #[test]
    fn recreating_same_run_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        RunContext::create(dir.path(), "r").unwrap();
        std::fs::write(dir.path().join("logs/r/profile_pages/keep.html"), b"x").unwrap();

        let ctx = RunContext::create(dir.path(), "r").unwrap();
        assert!(ctx.pages_dir().join("keep.html").exists());
    }
}
