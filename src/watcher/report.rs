use std::path::PathBuf;

use crate::artifacts::PhotoRotation;
use crate::error::{ArtifactKind, WatchError};
use crate::models::{ChangeEvent, StateRecord};

/// What one successful cycle produced.
#[derive(Debug)]
pub struct CycleReport {
    pub record: StateRecord,
    pub change: Option<ChangeEvent>,
    pub page: Option<PathBuf>,
    /// Where this cycle's photo lives after any slot rotation.
    pub photo: Option<PathBuf>,
    pub rotation: Option<PhotoRotation>,
    pub screenshot: Option<PathBuf>,
    pub change_record: Option<PathBuf>,
    pub artifact_errors: Vec<WatchError>,
}

impl CycleReport {
    pub(super) fn new(record: StateRecord, change: Option<ChangeEvent>) -> Self {
        Self {
            record,
            change,
            page: None,
            photo: None,
            rotation: None,
            screenshot: None,
            change_record: None,
            artifact_errors: Vec::new(),
        }
    }

    pub fn timestamp(&self) -> &str {
        &self.record.timestamp
    }

    pub fn changed(&self) -> bool {
        self.change.is_some()
    }

    pub fn artifact_failed(&self, kind: ArtifactKind) -> bool {
        self.artifact_errors
            .iter()
            .any(|err| matches!(err, WatchError::Artifact { kind: k, .. } if *k == kind))
    }
}
