use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use gridguide_core::{Channel, ChannelId, ChannelListFilter, DateRange, Event, RecordingStatus};

/// External data collaborator queried during a synchronization round.
///
/// Every call is independent; the coordinator issues them concurrently and
/// bounds each with its own timeout.
#[async_trait]
pub trait GuideSource: Send + Sync + 'static {
    /// The full channel catalog, in display order.
    async fn fetch_channels(&self) -> Result<Vec<Channel>>;

    /// Complete event listings for `channels` within `range`.
    ///
    /// A channel present in the result has its stored events replaced; a
    /// channel absent from the result is left untouched.
    async fn fetch_events(
        &self,
        channels: &[Channel],
        range: DateRange,
    ) -> Result<HashMap<ChannelId, Vec<Event>>>;

    /// Complete listing of recording statuses known to the backend.
    async fn fetch_recording_statuses(&self) -> Result<Vec<RecordingStatus>>;

    /// The channel list stored under `preference_key`, if any.
    async fn fetch_channel_list_filter(
        &self,
        preference_key: &str,
    ) -> Result<Option<ChannelListFilter>>;
}
