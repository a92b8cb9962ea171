use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDateTime;

use crate::models::TIMESTAMP_FORMAT;

pub fn to_i64(value: usize) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_usize(value: i64, field: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

/// Rejects keys that would not sort chronologically.
pub fn validate_timestamp(value: &str, field: &str) -> Result<()> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|_| ())
        .with_context(|| format!("{field} '{value}' is not a YYYY-MM-DD-HH-MM-SS timestamp"))
}

pub fn join_fields(fields: &[&str]) -> String {
    fields.join(",")
}

pub fn split_fields(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect()
}
