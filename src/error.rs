use std::fmt;

/// Artifact families written per cycle. Failures are reported per kind so one
/// failing artifact never blocks the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Page,
    Photo,
    PhotoSlot,
    Screenshot,
    ChangeRecord,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Page => "page",
            ArtifactKind::Photo => "photo",
            ArtifactKind::PhotoSlot => "photo slot",
            ArtifactKind::Screenshot => "screenshot",
            ArtifactKind::ChangeRecord => "change record",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("authentication failed: {0:#}")]
    Auth(anyhow::Error),

    #[error("fetch failed: {0:#}")]
    Fetch(anyhow::Error),

    #[error("persistence failed: {0:#}")]
    Persistence(anyhow::Error),

    #[error("{kind} artifact failed: {cause:#}")]
    Artifact {
        kind: ArtifactKind,
        cause: anyhow::Error,
    },
}

impl WatchError {
    pub fn artifact(kind: ArtifactKind, cause: anyhow::Error) -> Self {
        WatchError::Artifact { kind, cause }
    }

    /// Only a failed login ends the run; everything else costs one cycle at most.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WatchError::Auth(_))
    }
}
