//! Per-run artifact persistence: page snapshots, screenshots, avatar photos
//! and change records, all named by cycle timestamp.

pub mod download;
pub mod phash;
pub mod photo_slot;
pub mod run_context;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::models::{ChangeEvent, ProfileDetails};
use crate::run_log::RunLog;
use crate::utils::fs::write_new;
use crate::{run_info, run_warn};

pub use download::{Downloader, HttpDownloader};
pub use photo_slot::{rotate_photo_slot, PhotoRotation, SLOT_FILE};
pub use run_context::RunContext;

pub struct ArtifactStore {
    ctx: RunContext,
    log: RunLog,
}

impl ArtifactStore {
    pub fn new(ctx: RunContext, log: RunLog) -> Self {
        Self { ctx, log }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn slot_path(&self) -> PathBuf {
        self.ctx.pictures_dir().join(SLOT_FILE)
    }

    pub fn page_path(&self, timestamp: &str) -> PathBuf {
        self.ctx
            .pages_dir()
            .join(format!("profile_page_{timestamp}.html"))
    }

    pub fn photo_path(&self, timestamp: &str) -> PathBuf {
        self.ctx
            .pictures_dir()
            .join(format!("profile_picture_{timestamp}.jpg"))
    }

    pub fn screenshot_path(&self, timestamp: &str) -> PathBuf {
        self.ctx
            .screenshots_dir()
            .join(format!("profile_page_{timestamp}.png"))
    }

    pub fn change_record_path(&self, timestamp: &str) -> PathBuf {
        self.ctx
            .data_dir()
            .join(format!("profile_changes_{timestamp}.json"))
    }

    pub fn save_page(&self, timestamp: &str, html: &[u8]) -> Result<PathBuf> {
        let path = self.page_path(timestamp);
        write_new(&path, html).context("failed to save page")?;
        run_info!(self.log, "Profile page saved to {}", path.display());
        Ok(path)
    }

    pub fn save_screenshot(&self, timestamp: &str, png: &[u8]) -> Result<PathBuf> {
        let path = self.screenshot_path(timestamp);
        write_new(&path, png).context("failed to save screenshot")?;
        run_info!(self.log, "Screenshot saved to {}", path.display());
        Ok(path)
    }

    /// Downloads the avatar into a timestamped file. Returns `None` without
    /// writing anything when the URL is the "not found" sentinel.
    pub async fn commit_photo<D: Downloader>(
        &self,
        details: &ProfileDetails,
        timestamp: &str,
        downloader: &D,
    ) -> Result<Option<PathBuf>> {
        if !details.has_photo() {
            run_warn!(self.log, "Profile photo URL not found. Skipping download.");
            return Ok(None);
        }
        let url = details.profile_photo_url.as_str();

        let bytes = downloader
            .download(url)
            .await
            .with_context(|| format!("failed to download profile photo from {url}"))?;
        image::guess_format(&bytes)
            .with_context(|| format!("content downloaded from {url} is not an image"))?;

        let path = self.photo_path(timestamp);
        write_new(&path, &bytes).context("failed to save photo")?;
        run_info!(self.log, "Image saved to {}", path.display());
        Ok(Some(path))
    }

    pub fn rotate_photo_slot(
        &self,
        changed: bool,
        current_photo: &Path,
        timestamp: &str,
    ) -> Result<Option<PhotoRotation>> {
        let rotation = rotate_photo_slot(changed, current_photo, &self.slot_path(), timestamp)?;

        if let Some(rotation) = &rotation {
            if let Some(archived) = &rotation.archived {
                run_info!(self.log, "Previous profile photo archived to {}", archived.display());
            }
            if let Some(distance) = rotation.visual_distance {
                run_info!(self.log, "Profile photo visual distance from previous: {distance}");
            }
        }
        Ok(rotation)
    }

    /// Writes `{ "old_content": ..., "new_content": ... }` for downstream tooling.
    pub fn write_change_record(&self, event: &ChangeEvent) -> Result<PathBuf> {
        let path = self.change_record_path(&event.timestamp);
        let json = serde_json::to_string_pretty(&event.document())
            .context("failed to serialize change record")?;
        write_new(&path, json.as_bytes()).context("failed to save change record")?;
        run_info!(self.log, "Changes logged to {}", path.display());
        Ok(path)
    }
}
