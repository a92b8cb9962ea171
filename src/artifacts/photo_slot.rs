//! The "previous photo" slot.
//!
//! Exactly one file sits at the slot path and serves as the baseline for the
//! next avatar comparison. Rotation archives the current occupant first and
//! only then moves the new photo in; the reverse order would overwrite the
//! immediately preceding photo.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use log::debug;

use crate::utils::fs::{move_file, unused_path};

use super::phash::{compute_hamming_distance, compute_phash};

pub const SLOT_FILE: &str = "profile_picture_previous.jpg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRotation {
    /// Where the former slot occupant now lives, if there was one.
    pub archived: Option<PathBuf>,
    pub slot: PathBuf,
    /// Perceptual distance between the outgoing and incoming photo, when both decode.
    pub visual_distance: Option<u32>,
}

pub fn archive_stem(timestamp: &str) -> String {
    format!("profile_picture_{timestamp}_previous")
}

/// Rotates `current_photo` into `slot`. Does nothing unless `changed`.
pub fn rotate_photo_slot(
    changed: bool,
    current_photo: &Path,
    slot: &Path,
    timestamp: &str,
) -> Result<Option<PhotoRotation>> {
    if !changed {
        return Ok(None);
    }
    if !current_photo.is_file() {
        bail!("new photo {} does not exist", current_photo.display());
    }

    let mut archived = None;
    let mut visual_distance = None;

    if slot.exists() {
        visual_distance = visual_distance_between(slot, current_photo);

        let dir = slot.parent().unwrap_or_else(|| Path::new("."));
        let archive = unused_path(dir, &archive_stem(timestamp), "jpg");
        move_file(slot, &archive)?;
        archived = Some(archive);
    }

    move_file(current_photo, slot)?;

    Ok(Some(PhotoRotation {
        archived,
        slot: slot.to_path_buf(),
        visual_distance,
    }))
}

fn visual_distance_between(a: &Path, b: &Path) -> Option<u32> {
    let hash = |path: &Path| -> Option<String> {
        let bytes = std::fs::read(path).ok()?;
        match compute_phash(&bytes) {
            Ok(hash) => Some(hash),
            Err(err) => {
                debug!("pHash skipped for {}: {err}", path.display());
                None
            }
        }
    };

    let lhs = hash(a)?;
    let rhs = hash(b)?;
    Some(compute_hamming_distance(&lhs, &rhs))
}
