use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::marks::DateBounds;
use crate::model::{
    Channel, ChannelId, Event, EventId, RecordingState, RecordingStatus,
};

/// Fixed reference midnight (2024-03-01T00:00Z) plus `hours`.
pub fn at(hours: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0)
        .single()
        .expect("valid reference date")
        + Duration::hours(hours)
}

/// min = reference midnight, now = +5h, prime time = +8h, max = +14d.
pub fn bounds() -> DateBounds {
    DateBounds::new(at(0), at(5), at(8), at(0) + Duration::days(14)).expect("valid bounds")
}

pub fn channel(id: &str, name: &str) -> Channel {
    Channel {
        id: ChannelId::new(id),
        name: name.to_string(),
        logo_ref: None,
    }
}

pub fn event(
    id: &str,
    channel_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    title: &str,
) -> Event {
    Event {
        id: EventId::new(id),
        channel_id: ChannelId::new(channel_id),
        start_time: start,
        end_time: end,
        title: title.to_string(),
    }
}

pub fn status(event_id: &str, state: RecordingState) -> RecordingStatus {
    RecordingStatus {
        event_id: EventId::new(event_id),
        state,
    }
}
