use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The independent data sources fetched during a synchronization round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchSource {
    Channels,
    Events,
    RecordingStatuses,
    ChannelListFilter,
}

impl FetchSource {
    pub const ALL: [FetchSource; 4] = [
        FetchSource::Channels,
        FetchSource::Events,
        FetchSource::RecordingStatuses,
        FetchSource::ChannelListFilter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Channels => "channels",
            Self::Events => "events",
            Self::RecordingStatuses => "recording_statuses",
            Self::ChannelListFilter => "channel_list_filter",
        }
    }
}

impl fmt::Display for FetchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-fatal conditions reported alongside a published snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncError {
    #[error("fetching {data_source} failed: {reason}")]
    FetchFailure {
        data_source: FetchSource,
        reason: String,
    },
    #[error("fetching {data_source} timed out after {after_ms}ms")]
    FetchTimedOut {
        data_source: FetchSource,
        after_ms: u64,
    },
    #[error("round {epoch} discarded, latest requested round is {latest}")]
    StaleRoundDiscarded { epoch: u64, latest: u64 },
    #[error("sync controller is no longer running")]
    ControllerClosed,
}

impl SyncError {
    pub fn fetch_source(&self) -> Option<FetchSource> {
        match self {
            Self::FetchFailure { data_source, .. } | Self::FetchTimedOut { data_source, .. } => {
                Some(*data_source)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoundsError {
    #[error("min time {min} is not before max time {max}")]
    Inverted {
        min: DateTime<Utc>,
        max: DateTime<Utc>,
    },
    #[error("fetch window must extend on both sides of the selection time")]
    EmptyFetchWindow,
    #[error("invalid prime time {0:?}, expected HH:MM")]
    InvalidPrimeTime(String),
    #[error("utc offset of {0} minutes is out of range")]
    InvalidUtcOffset(i32),
}
