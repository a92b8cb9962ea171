use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const FOLLOWERS_NOT_FOUND: &str = "Followers count not found";
pub const FOLLOWINGS_NOT_FOUND: &str = "Followings count not found";
pub const BIO_NOT_FOUND: &str = "Bio not found";
pub const PHOTO_NOT_FOUND: &str = "Profile photo not found";

/// Timestamps are rendered as `YYYY-MM-DD-HH-MM-SS`, which sorts lexicographically.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

pub fn format_timestamp(at: DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn now_timestamp() -> String {
    format_timestamp(Local::now())
}

/// The timestamp one second after `last`, or `None` if `last` is malformed.
pub fn timestamp_after(last: &str) -> Option<String> {
    let parsed = NaiveDateTime::parse_from_str(last, TIMESTAMP_FORMAT).ok()?;
    let next = parsed + chrono::Duration::seconds(1);
    Some(next.format(TIMESTAMP_FORMAT).to_string())
}

/// The observed fields of a profile.
///
/// A field the fetcher could not read carries its "not found" sentinel instead
/// of being absent, so partial observations still take part in diffing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDetails {
    pub followers: String,
    pub followings: String,
    pub bio: String,
    pub profile_photo_url: String,
}

impl ProfileDetails {
    pub fn not_found() -> Self {
        Self {
            followers: FOLLOWERS_NOT_FOUND.to_string(),
            followings: FOLLOWINGS_NOT_FOUND.to_string(),
            bio: BIO_NOT_FOUND.to_string(),
            profile_photo_url: PHOTO_NOT_FOUND.to_string(),
        }
    }

    pub fn has_photo(&self) -> bool {
        self.profile_photo_url != PHOTO_NOT_FOUND && !self.profile_photo_url.is_empty()
    }
}

/// One observation of the target, keyed by its timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    pub timestamp: String,
    #[serde(flatten)]
    pub details: ProfileDetails,
}

impl StateRecord {
    pub fn new(timestamp: impl Into<String>, details: ProfileDetails) -> Self {
        Self {
            timestamp: timestamp.into(),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_format_sorts_chronologically() {
        let earlier = Local.with_ymd_and_hms(2024, 9, 30, 23, 59, 59).unwrap();
        let later = Local.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap();

        let a = format_timestamp(earlier);
        let b = format_timestamp(later);

        assert_eq!(a, "2024-09-30-23-59-59");
        assert!(a < b);
    }

    #[test]
    fn timestamp_after_rolls_over_fields() {
        assert_eq!(
            timestamp_after("2024-11-03-01-30-00").as_deref(),
            Some("2024-11-03-01-30-01")
        );
        assert_eq!(
            timestamp_after("2024-12-31-23-59-59").as_deref(),
            Some("2025-01-01-00-00-00")
        );
        assert_eq!(timestamp_after("yesterday"), None);
    }

    #[test]
    fn sentinel_photo_is_not_a_photo() {
        let details = ProfileDetails::not_found();
        assert!(!details.has_photo());

        let with_photo = ProfileDetails {
            profile_photo_url: "http://x/a.jpg".into(),
            ..details
        };
        assert!(with_photo.has_photo());
    }

    #[test]
    fn record_serializes_flat() {
        let record = StateRecord::new(
            "2024-01-01-00-00-00",
            ProfileDetails {
                followers: "100".into(),
                followings: "50".into(),
                bio: "hi".into(),
                profile_photo_url: "http://x/a.jpg".into(),
            },
        );

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["timestamp"], "2024-01-01-00-00-00");
        assert_eq!(value["followers"], "100");
        assert_eq!(value["profile_photo_url"], "http://x/a.jpg");
    }
}
