//! A [`GuideSource`] backed by an in-memory guide document, loadable from JSON.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use gridguide_core::{Channel, ChannelId, ChannelListFilter, DateRange, Event, RecordingStatus};
use serde::{Deserialize, Serialize};

use crate::source::GuideSource;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuideFixture {
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub recording_statuses: Vec<RecordingStatus>,
    #[serde(default)]
    pub channel_lists: Vec<ChannelListFilter>,
    /// Preference key -> selected channel list id.
    #[serde(default)]
    pub preferences: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct StaticGuideSource {
    fixture: GuideFixture,
}

impl StaticGuideSource {
    pub fn new(fixture: GuideFixture) -> Self {
        Self { fixture }
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let fixture: GuideFixture =
            serde_json::from_str(raw).context("Failed to parse guide fixture")?;
        Ok(Self::new(fixture))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read guide fixture {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("Failed to load guide fixture {}", path.display()))
    }

    pub fn fixture(&self) -> &GuideFixture {
        &self.fixture
    }
}

#[async_trait]
impl GuideSource for StaticGuideSource {
    async fn fetch_channels(&self) -> Result<Vec<Channel>> {
        Ok(self.fixture.channels.clone())
    }

    async fn fetch_events(
        &self,
        channels: &[Channel],
        range: DateRange,
    ) -> Result<HashMap<ChannelId, Vec<Event>>> {
        let mut listing: HashMap<ChannelId, Vec<Event>> = channels
            .iter()
            .map(|channel| (channel.id.clone(), Vec::new()))
            .collect();
        for event in &self.fixture.events {
            if !range.overlaps(event.start_time, event.end_time) {
                continue;
            }
            if let Some(events) = listing.get_mut(&event.channel_id) {
                events.push(event.clone());
            }
        }
        Ok(listing)
    }

    async fn fetch_recording_statuses(&self) -> Result<Vec<RecordingStatus>> {
        Ok(self.fixture.recording_statuses.clone())
    }

    async fn fetch_channel_list_filter(
        &self,
        preference_key: &str,
    ) -> Result<Option<ChannelListFilter>> {
        let Some(list_id) = self.fixture.preferences.get(preference_key) else {
            return Ok(None);
        };
        Ok(self
            .fixture
            .channel_lists
            .iter()
            .find(|list| &list.id == list_id)
            .cloned())
    }
}
