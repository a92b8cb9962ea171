use std::time::Duration;

use anyhow::{bail, Context, Result};

const DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Fetches binary resources such as avatar images.
#[allow(async_fn_in_trait)]
pub trait Downloader {
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpDownloader {
    http: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .user_agent(concat!("profile-watcher/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http })
    }
}

impl Downloader for HttpDownloader {
    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        if !response.status().is_success() {
            bail!("HTTP {} from {url}", response.status());
        }

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("failed to read body from {url}"))?;
        Ok(bytes.to_vec())
    }
}
