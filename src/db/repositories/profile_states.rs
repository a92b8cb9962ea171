use anyhow::{Context, Result};
use rusqlite::{params, Row};

use crate::db::{
    helpers::{to_i64, to_usize, validate_timestamp},
    Database,
};
use crate::models::{
    ProfileDetails, StateRecord, BIO_NOT_FOUND, FOLLOWERS_NOT_FOUND, FOLLOWINGS_NOT_FOUND,
    PHOTO_NOT_FOUND,
};

// NULL columns can only come from rows written by other tooling; they read
// back as the field's sentinel.
fn row_to_record(row: &Row) -> rusqlite::Result<StateRecord> {
    let text = |idx: usize, sentinel: &str| -> rusqlite::Result<String> {
        Ok(row
            .get::<_, Option<String>>(idx)?
            .unwrap_or_else(|| sentinel.to_string()))
    };

    Ok(StateRecord {
        timestamp: row.get(0)?,
        details: ProfileDetails {
            followers: text(1, FOLLOWERS_NOT_FOUND)?,
            followings: text(2, FOLLOWINGS_NOT_FOUND)?,
            bio: text(3, BIO_NOT_FOUND)?,
            profile_photo_url: text(4, PHOTO_NOT_FOUND)?,
        },
    })
}

impl Database {
    /// Inserts the record, replacing any row with the same timestamp.
    pub async fn upsert_state(&self, record: &StateRecord) -> Result<()> {
        validate_timestamp(&record.timestamp, "timestamp")?;
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO profile_details
                    (timestamp, followers, followings, bio, profile_photo_url)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.timestamp,
                    record.details.followers,
                    record.details.followings,
                    record.details.bio,
                    record.details.profile_photo_url,
                ],
            )
            .with_context(|| format!("failed to save state {}", record.timestamp))?;
            Ok(())
        })
        .await
    }

    /// The record with the greatest timestamp, if any.
    pub async fn latest_state(&self) -> Result<Option<StateRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT timestamp, followers, followings, bio, profile_photo_url
                 FROM profile_details
                 ORDER BY timestamp DESC
                 LIMIT 1",
            )?;

            let mut rows = stmt.query([])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_record(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// Most recent records first.
    pub async fn list_states(&self, limit: usize) -> Result<Vec<StateRecord>> {
        let limit = to_i64(limit)?;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT timestamp, followers, followings, bio, profile_photo_url
                 FROM profile_details
                 ORDER BY timestamp DESC
                 LIMIT ?1",
            )?;

            let records = stmt
                .query_map(params![limit], row_to_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
        .await
    }

    pub async fn count_states(&self) -> Result<usize> {
        self.execute(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM profile_details", [], |row| row.get(0))?;
            to_usize(count, "count")
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(followers: &str) -> ProfileDetails {
        ProfileDetails {
            followers: followers.into(),
            followings: "50".into(),
            bio: "hi".into(),
            profile_photo_url: "http://x/a.jpg".into(),
        }
    }

    fn open() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("profile_data.db")).unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn empty_store_has_no_latest() {
        let (_dir, db) = open();
        assert!(db.latest_state().await.unwrap().is_none());
        assert_eq!(db.count_states().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn latest_is_max_timestamp_not_insert_order() {
        let (_dir, db) = open();
        db.upsert_state(&StateRecord::new("2024-01-01-00-06-00", details("3")))
            .await
            .unwrap();
        db.upsert_state(&StateRecord::new("2024-01-01-00-00-00", details("1")))
            .await
            .unwrap();
        db.upsert_state(&StateRecord::new("2024-01-01-00-03-00", details("2")))
            .await
            .unwrap();

        let latest = db.latest_state().await.unwrap().unwrap();
        assert_eq!(latest.timestamp, "2024-01-01-00-06-00");
        assert_eq!(latest.details.followers, "3");

        let listed = db.list_states(2).await.unwrap();
        let stamps: Vec<_> = listed.iter().map(|r| r.timestamp.as_str()).collect();
        assert_eq!(stamps, vec!["2024-01-01-00-06-00", "2024-01-01-00-03-00"]);
    }

    #[tokio::test]
    async fn upsert_is_idempotent_and_last_write_wins() {
        let (_dir, db) = open();
        let record = StateRecord::new("2024-01-01-00-00-00", details("100"));

        db.upsert_state(&record).await.unwrap();
        db.upsert_state(&record).await.unwrap();
        assert_eq!(db.count_states().await.unwrap(), 1);

        let replacement = StateRecord::new("2024-01-01-00-00-00", details("200"));
        db.upsert_state(&replacement).await.unwrap();
        assert_eq!(db.count_states().await.unwrap(), 1);
        assert_eq!(db.latest_state().await.unwrap().unwrap(), replacement);
    }

    #[tokio::test]
    async fn sentinels_are_stored_verbatim() {
        let (_dir, db) = open();
        let record = StateRecord::new("2024-01-01-00-00-00", ProfileDetails::not_found());
        db.upsert_state(&record).await.unwrap();

        assert_eq!(db.latest_state().await.unwrap().unwrap(), record);
    }

    #[tokio::test]
    async fn rejects_unsortable_timestamp() {
        let (_dir, db) = open();
        let err = db
            .upsert_state(&StateRecord::new("yesterday", details("1")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a YYYY-MM-DD-HH-MM-SS timestamp"));
        assert_eq!(db.count_states().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile_data.db");
        let record = StateRecord::new("2024-01-01-00-00-00", details("100"));

        {
            let db = Database::new(path.clone()).unwrap();
            db.upsert_state(&record).await.unwrap();
        }

        let reopened = Database::new(path).unwrap();
        assert_eq!(reopened.latest_state().await.unwrap().unwrap(), record);
    }
}
