use anyhow::{Context, Result};
use rusqlite::{params, Row};

use crate::db::{
    helpers::{join_fields, split_fields, to_i64},
    models::ChangeRow,
    Database,
};
use crate::models::{now_timestamp, ChangeEvent};

fn row_to_change(row: &Row) -> rusqlite::Result<ChangeRow> {
    let fields: String = row.get("changed_fields")?;
    Ok(ChangeRow {
        id: row.get("id")?,
        detected_at: row.get("detected_at")?,
        previous_timestamp: row.get("previous_timestamp")?,
        new_timestamp: row.get("new_timestamp")?,
        changed_fields: split_fields(&fields),
        record_path: row.get("record_path")?,
    })
}

impl Database {
    /// Indexes a detected change together with the path of its JSON record.
    pub async fn insert_change(
        &self,
        event: &ChangeEvent,
        record_path: Option<String>,
    ) -> Result<i64> {
        let detected_at = now_timestamp();
        let previous_timestamp = event.previous.timestamp.clone();
        let new_timestamp = event.current.timestamp.clone();
        let changed_fields = join_fields(&event.changed_fields());

        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO profile_changes
                    (detected_at, previous_timestamp, new_timestamp, changed_fields, record_path)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    detected_at,
                    previous_timestamp,
                    new_timestamp,
                    changed_fields,
                    record_path,
                ],
            )
            .context("failed to insert change row")?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Most recent changes first.
    pub async fn list_changes(&self, limit: usize) -> Result<Vec<ChangeRow>> {
        let limit = to_i64(limit)?;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, detected_at, previous_timestamp, new_timestamp, changed_fields, record_path
                 FROM profile_changes
                 ORDER BY id DESC
                 LIMIT ?1",
            )?;

            let rows = stmt
                .query_map(params![limit], row_to_change)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }
}
