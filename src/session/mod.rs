//! Authenticated access to the remote profile.
//!
//! The core only sees the `ProfileFetcher` capability. How a fetcher logs in
//! and reads the page is its own business.

pub mod http;

use std::{future::Future, time::Duration};

use anyhow::{anyhow, Result};

use crate::error::{ArtifactKind, WatchError};
use crate::models::ProfileDetails;

pub use http::HttpProfileFetcher;

/// A fetcher holds sequential interactive state and is never shared between
/// concurrent callers.
#[allow(async_fn_in_trait)]
pub trait ProfileFetcher {
    /// Called once per process, before the first cycle.
    async fn login(&mut self) -> Result<()>;

    /// Best-effort observation. Unreadable fields carry their sentinel.
    async fn fetch(&mut self, target: &str) -> Result<ProfileDetails>;

    async fn fetch_raw_page(&mut self, target: &str) -> Result<Vec<u8>>;

    async fn fetch_screenshot(&mut self) -> Result<Vec<u8>>;

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct Session<F> {
    fetcher: F,
    fetch_timeout: Option<Duration>,
}

impl<F: ProfileFetcher> Session<F> {
    /// Logs in once. A failure here is fatal to the run.
    pub async fn establish(mut fetcher: F, fetch_timeout: Option<Duration>) -> Result<Self, WatchError> {
        fetcher.login().await.map_err(WatchError::Auth)?;
        Ok(Self {
            fetcher,
            fetch_timeout,
        })
    }

    pub async fn fetch(&mut self, target: &str) -> Result<ProfileDetails, WatchError> {
        let limit = self.fetch_timeout;
        with_timeout(limit, self.fetcher.fetch(target))
            .await
            .map_err(WatchError::Fetch)
    }

    pub async fn fetch_raw_page(&mut self, target: &str) -> Result<Vec<u8>, WatchError> {
        let limit = self.fetch_timeout;
        with_timeout(limit, self.fetcher.fetch_raw_page(target))
            .await
            .map_err(|err| WatchError::artifact(ArtifactKind::Page, err))
    }

    pub async fn fetch_screenshot(&mut self) -> Result<Vec<u8>, WatchError> {
        let limit = self.fetch_timeout;
        with_timeout(limit, self.fetcher.fetch_screenshot())
            .await
            .map_err(|err| WatchError::artifact(ArtifactKind::Screenshot, err))
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub async fn close(mut self) -> Result<()> {
        self.fetcher.close().await
    }
}

async fn with_timeout<T>(
    limit: Option<Duration>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match limit {
        None => fut.await,
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!("timed out after {}s", limit.as_secs())),
        },
    }
}
