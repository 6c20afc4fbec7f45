use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::marks::JumpMarks;
use crate::model::{ChannelEntry, DateRange};
use crate::window::ChannelWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Idle,
    Loading {
        epoch: u64,
    },
    Ready {
        epoch: u64,
    },
}

impl SyncState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }
}

/// Everything the renderer needs, published as one consistent value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuideSnapshot {
    pub epoch: u64,
    pub state: SyncState,
    pub channels: Vec<ChannelEntry>,
    pub window: ChannelWindow,
    pub fetch_range: Option<DateRange>,
    pub visible_range: Option<DateRange>,
    pub jump_marks: JumpMarks,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<SyncError>,
}

impl GuideSnapshot {
    pub fn is_ready(&self) -> bool {
        matches!(self.state, SyncState::Ready { .. })
    }

    pub fn event_count(&self) -> usize {
        self.channels.iter().map(|entry| entry.events.len()).sum()
    }
}
