//! Persisted index entry for a detected change.

use serde::{Deserialize, Serialize};

/// One row of the change history. The full before/after records live in the
/// JSON file at `record_path`; the state rows are keyed by the two timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRow {
    pub id: i64,
    pub detected_at: String,
    pub previous_timestamp: String,
    pub new_timestamp: String,
    pub changed_fields: Vec<String>,
    pub record_path: Option<String>,
}
