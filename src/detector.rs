//! Change detection between consecutive observations.
//!
//! Fields are compared literally: whitespace, casing and number formatting all
//! count, since the remote rendering is the source of truth.

use crate::models::{ChangeEvent, StateRecord};

/// Compares `current` against the last known record.
///
/// The first observation (`previous == None`) only establishes the baseline and
/// never produces an event. The timestamps of the two records are not compared.
pub fn diff(previous: Option<&StateRecord>, current: &StateRecord) -> Option<ChangeEvent> {
    let previous = previous?;

    if previous.details == current.details {
        return None;
    }

    Some(ChangeEvent {
        previous: previous.clone(),
        current: current.clone(),
        timestamp: current.timestamp.clone(),
    })
}
