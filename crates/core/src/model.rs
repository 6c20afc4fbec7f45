use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Returns `None` unless `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    pub fn covers(&self, other: &DateRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && self.start < end
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub channel_id: ChannelId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingState {
    Scheduled,
    Recording,
    Recorded,
    Failed,
    Cancelled,
}

impl RecordingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Recording => "recording",
            Self::Recorded => "recorded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingStatus {
    pub event_id: EventId,
    pub state: RecordingState,
}

/// An immutable [`Event`] plus the recording status overlaid onto it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventView {
    pub event: Event,
    pub channel_id: ChannelId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_status: Option<RecordingStatus>,
}

impl EventView {
    pub fn new(event: Event, channel_id: ChannelId) -> Self {
        Self {
            event,
            channel_id,
            recording_status: None,
        }
    }

    pub fn id(&self) -> &EventId {
        &self.event.id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.event.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.event.end_time
    }

    /// `HH:MM–HH:MM` in UTC.
    pub fn timeframe(&self) -> String {
        format!(
            "{}–{}",
            self.event.start_time.format("%H:%M"),
            self.event.end_time.format("%H:%M")
        )
    }
}

/// A channel and its events, ascending by start time and unique by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEntry {
    pub channel: Channel,
    pub events: Vec<EventView>,
}

impl ChannelEntry {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> &ChannelId {
        &self.channel.id
    }

    pub fn contains_event(&self, event_id: &EventId) -> bool {
        self.events.iter().any(|view| view.id() == event_id)
    }
}

/// A named subset of channels chosen by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelListFilter {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub channel_ids: Vec<ChannelId>,
}

impl ChannelListFilter {
    /// An empty list restricts nothing.
    pub fn admits(&self, channel_id: &ChannelId) -> bool {
        self.channel_ids.is_empty() || self.channel_ids.contains(channel_id)
    }
}

/// Channel-name search text, lowercased with all whitespace removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn new(text: &str) -> Self {
        Self(normalize(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, channel_name: &str) -> bool {
        self.0.is_empty() || normalize(channel_name).contains(&self.0)
    }
}

fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
