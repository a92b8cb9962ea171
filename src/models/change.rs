use serde::Serialize;

use super::profile::StateRecord;

/// A detected difference between two consecutive observations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub previous: StateRecord,
    pub current: StateRecord,
    pub timestamp: String,
}

/// On-disk shape of a change record. Downstream tooling reads these files.
#[derive(Debug, Serialize)]
pub struct ChangeDocument<'a> {
    pub old_content: &'a StateRecord,
    pub new_content: &'a StateRecord,
}

impl ChangeEvent {
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let old = &self.previous.details;
        let new = &self.current.details;
        let mut fields = Vec::new();
        if old.followers != new.followers {
            fields.push("followers");
        }
        if old.followings != new.followings {
            fields.push("followings");
        }
        if old.bio != new.bio {
            fields.push("bio");
        }
        if old.profile_photo_url != new.profile_photo_url {
            fields.push("profile_photo_url");
        }
        fields
    }

    pub fn avatar_changed(&self) -> bool {
        self.previous.details.profile_photo_url != self.current.details.profile_photo_url
    }

    pub fn document(&self) -> ChangeDocument<'_> {
        ChangeDocument {
            old_content: &self.previous,
            new_content: &self.current,
        }
    }
}
