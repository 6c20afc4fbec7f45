use std::collections::HashMap;

use crate::model::{EventId, RecordingStatus};

/// Every recording status known so far, keyed by event id.
///
/// Statuses for events that are not in the store yet are kept here so they
/// can be re-applied after the next event merge.
#[derive(Debug, Clone, Default)]
pub struct RecordingStatusBook {
    statuses: HashMap<EventId, RecordingStatus>,
}

impl RecordingStatusBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace statuses by event id.
    pub fn upsert_all(&mut self, statuses: impl IntoIterator<Item = RecordingStatus>) {
        for status in statuses {
            self.statuses.insert(status.event_id.clone(), status);
        }
    }

    /// Replace the whole book with a complete listing.
    pub fn replace_all(&mut self, statuses: impl IntoIterator<Item = RecordingStatus>) {
        self.statuses.clear();
        self.upsert_all(statuses);
    }

    pub fn get(&self, event_id: &EventId) -> Option<&RecordingStatus> {
        self.statuses.get(event_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordingStatus> {
        self.statuses.values()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}
