use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use log::{debug, warn};

/// Exclusive marker file next to the database. Only one watcher may write a
/// given state table at a time.
pub(super) struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    pub(super) fn acquire(db_path: &Path) -> Result<Self> {
        let mut name = db_path.as_os_str().to_owned();
        name.push(".lock");
        let path = PathBuf::from(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                writeln!(file, "{}", std::process::id())
                    .with_context(|| format!("failed to write lock file {}", path.display()))?;
                debug!("Acquired store lock {}", path.display());
                Ok(Self { path })
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&path).unwrap_or_default();
                bail!(
                    "store lock {} is held by process {}; remove it if that watcher is no longer running",
                    path.display(),
                    holder.trim()
                )
            }
            Err(err) => Err(err)
                .with_context(|| format!("failed to create lock file {}", path.display())),
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            warn!("Failed to release store lock {}: {err}", self.path.display());
        }
    }
}
