use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_INTERVAL_SECS: u64 = 180;
pub const DEFAULT_BASE_DIR: &str = "watch_data";
pub const DEFAULT_PROFILE_BASE_URL: &str = "https://www.instagram.com";
const DATABASE_FILE: &str = "profile_data.db";

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Startup configuration. Built once, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub target: String,
    pub interval_secs: u64,
    pub credentials: Credentials,
    pub base_dir: PathBuf,
    pub database_path: Option<PathBuf>,
    pub profile_base_url: String,
    pub fetch_timeout_secs: Option<u64>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            interval_secs: DEFAULT_INTERVAL_SECS,
            credentials: Credentials::default(),
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            database_path: None,
            profile_base_url: DEFAULT_PROFILE_BASE_URL.into(),
            fetch_timeout_secs: None,
        }
    }
}

impl WatcherConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            bail!("no target profile configured");
        }
        // Cycle timestamps have one-second resolution.
        if self.interval_secs == 0 {
            bail!("interval must be at least one second");
        }
        if self.fetch_timeout_secs == Some(0) {
            bail!("fetch timeout must be at least one second when set");
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.base_dir.join(DATABASE_FILE))
    }
}

/// Command-line and environment overrides, applied on top of the config file.
#[derive(Debug, Default, Parser)]
#[command(name = "profile-watcher", version, about = "Watch a public profile for changes")]
pub struct Cli {
    /// JSON config file
    #[arg(long, env = "WATCHER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Profile to watch
    #[arg(long, env = "WATCHER_TARGET")]
    pub target: Option<String>,

    /// Seconds between cycle starts
    #[arg(long, env = "WATCHER_INTERVAL")]
    pub interval: Option<u64>,

    #[arg(long, env = "WATCHER_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "WATCHER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Root for run directories and the default database
    #[arg(long, env = "WATCHER_BASE_DIR")]
    pub base_dir: Option<PathBuf>,

    #[arg(long, env = "WATCHER_DATABASE")]
    pub database: Option<PathBuf>,

    #[arg(long, env = "WATCHER_BASE_URL")]
    pub base_url: Option<String>,

    /// Abandon a fetch after this many seconds
    #[arg(long, env = "WATCHER_FETCH_TIMEOUT")]
    pub fetch_timeout: Option<u64>,
}

impl Cli {
    pub fn into_config(self) -> Result<WatcherConfig> {
        let mut config = match &self.config {
            Some(path) => WatcherConfig::from_file(path)?,
            None => WatcherConfig::default(),
        };

        if let Some(target) = self.target {
            config.target = target;
        }
        if let Some(interval) = self.interval {
            config.interval_secs = interval;
        }
        if let Some(username) = self.username {
            config.credentials.username = username;
        }
        if let Some(password) = self.password {
            config.credentials.password = password;
        }
        if let Some(base_dir) = self.base_dir {
            config.base_dir = base_dir;
        }
        if let Some(database) = self.database {
            config.database_path = Some(database);
        }
        if let Some(base_url) = self.base_url {
            config.profile_base_url = base_url;
        }
        if let Some(timeout) = self.fetch_timeout {
            config.fetch_timeout_secs = Some(timeout);
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_fill_missing_fields_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watcher.json");
        fs::write(
            &path,
            r#"{ "target": "example_user", "credentials": { "username": "me" } }"#,
        )
        .unwrap();

        let config = WatcherConfig::from_file(&path).unwrap();
        assert_eq!(config.target, "example_user");
        assert_eq!(config.interval_secs, DEFAULT_INTERVAL_SECS);
        assert_eq!(config.credentials.username, "me");
        assert_eq!(config.database_path(), PathBuf::from("watch_data/profile_data.db"));
    }

    #[test]
    fn cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watcher.json");
        fs::write(&path, r#"{ "target": "a", "interval_secs": 60 }"#).unwrap();

        let cli = Cli::parse_from([
            "profile-watcher",
            "--config",
            path.to_str().unwrap(),
            "--target",
            "b",
            "--base-dir",
            "/tmp/w",
        ]);
        let config = cli.into_config().unwrap();

        assert_eq!(config.target, "b");
        assert_eq!(config.interval(), Duration::from_secs(60));
        assert_eq!(config.database_path(), PathBuf::from("/tmp/w/profile_data.db"));
    }

    #[test]
    fn validation_rejects_unusable_settings() {
        let mut config = WatcherConfig::default();
        assert!(config.validate().is_err());

        config.target = "someone".into();
        assert!(config.validate().is_ok());

        config.interval_secs = 0;
        assert!(config.validate().is_err());

        config.interval_secs = 5;
        config.fetch_timeout_secs = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_output_hides_password() {
        let credentials = Credentials {
            username: "me".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("me"));
        assert!(!rendered.contains("hunter2"));
    }
}
