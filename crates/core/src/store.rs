//! Canonical in-memory channel/event model.
//!
//! The store owns every [`ChannelEntry`]. Two independent predicates narrow
//! the catalog to the *visible* ordering: the optional channel-list filter and
//! the normalized search query. All positional lookups (`section`, `row`)
//! address that visible ordering and are invalidated by any change to the
//! catalog or either predicate.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::model::{
    Channel, ChannelEntry, ChannelId, ChannelListFilter, Event, EventId, EventView,
    RecordingStatus, SearchQuery,
};
use crate::window::ChannelWindow;

#[derive(Debug, Clone, Default)]
pub struct ChannelEventStore {
    entries: Vec<ChannelEntry>,
    filter: Option<ChannelListFilter>,
    query: SearchQuery,
}

impl ChannelEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the channel catalog.
    ///
    /// Events already merged for a channel id that survives the reload are
    /// kept. Duplicate ids in `channels` keep their first occurrence.
    pub fn set_channels(&mut self, channels: Vec<Channel>) {
        let mut previous: HashMap<ChannelId, Vec<EventView>> = self
            .entries
            .drain(..)
            .map(|entry| (entry.channel.id, entry.events))
            .collect();

        let mut entries: Vec<ChannelEntry> = Vec::with_capacity(channels.len());
        for channel in channels {
            if entries.iter().any(|entry| entry.channel.id == channel.id) {
                continue;
            }
            let events = previous.remove(&channel.id).unwrap_or_default();
            entries.push(ChannelEntry { channel, events });
        }
        self.entries = entries;
    }

    /// Replace the full event list of one channel.
    ///
    /// Events are de-duplicated by id (last write wins) and sorted ascending by
    /// start time, ties ordered by id. Returns `false` when the channel is not
    /// in the catalog.
    pub fn merge_events(&mut self, channel_id: &ChannelId, events: Vec<Event>) -> bool {
        let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| &entry.channel.id == channel_id)
        else {
            return false;
        };

        let mut views: Vec<EventView> = Vec::with_capacity(events.len());
        let mut positions: HashMap<EventId, usize> = HashMap::with_capacity(events.len());
        for event in events {
            let view = EventView::new(event, channel_id.clone());
            match positions.get(view.id()) {
                Some(&index) => views[index] = view,
                None => {
                    positions.insert(view.id().clone(), views.len());
                    views.push(view);
                }
            }
        }
        views.sort_by(|a, b| {
            a.start_time()
                .cmp(&b.start_time())
                .then_with(|| a.id().cmp(b.id()))
        });

        entry.events = views;
        true
    }

    /// Overlay `status` onto every stored event with the same id.
    ///
    /// Returns `false` (and drops the status) when no such event exists yet.
    pub fn apply_recording_status(&mut self, status: &RecordingStatus) -> bool {
        let mut applied = false;
        for entry in &mut self.entries {
            for view in &mut entry.events {
                if view.id() == &status.event_id {
                    view.recording_status = Some(status.clone());
                    applied = true;
                }
            }
        }
        applied
    }

    /// Apply many statuses; returns how many found a matching event.
    pub fn apply_recording_statuses<'a, I>(&mut self, statuses: I) -> usize
    where
        I: IntoIterator<Item = &'a RecordingStatus>,
    {
        statuses
            .into_iter()
            .filter(|status| self.apply_recording_status(status))
            .count()
    }

    pub fn clear_recording_statuses(&mut self) {
        for entry in &mut self.entries {
            for view in &mut entry.events {
                view.recording_status = None;
            }
        }
    }

    pub fn set_filter(&mut self, filter: Option<ChannelListFilter>) {
        self.filter = filter;
    }

    pub fn set_search_query(&mut self, text: &str) {
        self.query = SearchQuery::new(text);
    }

    pub fn filter(&self) -> Option<&ChannelListFilter> {
        self.filter.as_ref()
    }

    pub fn search_query(&self) -> &SearchQuery {
        &self.query
    }

    fn is_visible(&self, entry: &ChannelEntry) -> bool {
        let admitted = self
            .filter
            .as_ref()
            .is_none_or(|filter| filter.admits(&entry.channel.id));
        admitted && self.query.matches(&entry.channel.name)
    }

    /// Channels passing both predicates, in catalog order.
    pub fn visible_channels(&self) -> Vec<&ChannelEntry> {
        self.entries
            .iter()
            .filter(|entry| self.is_visible(entry))
            .collect()
    }

    pub fn visible_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| self.is_visible(entry))
            .count()
    }

    /// Owned copy of the visible ordering, for snapshots.
    pub fn visible_entries(&self) -> Vec<ChannelEntry> {
        self.visible_channels().into_iter().cloned().collect()
    }

    /// Visible channels whose section lies inside `window`.
    pub fn channels_in_window(&self, window: &ChannelWindow) -> Vec<Channel> {
        self.visible_channels()
            .into_iter()
            .enumerate()
            .filter(|(section, _)| window.contains(*section))
            .map(|(_, entry)| entry.channel.clone())
            .collect()
    }

    pub fn channel_section(&self, channel_id: &ChannelId) -> Option<usize> {
        self.visible_channels()
            .iter()
            .position(|entry| &entry.channel.id == channel_id)
    }

    pub fn event_at(&self, section: usize, column: usize) -> Option<&EventView> {
        self.visible_channels()
            .get(section)
            .and_then(|entry| entry.events.get(column))
    }

    /// Row count of a section: never below one, so empty channels still render.
    pub fn rows_in_section(&self, section: usize) -> Option<usize> {
        self.visible_channels()
            .get(section)
            .map(|entry| entry.events.len().max(1))
    }

    pub fn index_path_for_event(&self, event_id: &EventId) -> Option<(usize, usize)> {
        self.visible_channels()
            .iter()
            .enumerate()
            .find_map(|(section, entry)| {
                entry
                    .events
                    .iter()
                    .position(|view| view.id() == event_id)
                    .map(|row| (section, row))
            })
    }

    /// Earliest event of `section` starting strictly after `after`.
    pub fn next_event_after(&self, section: usize, after: DateTime<Utc>) -> Option<&EventView> {
        self.visible_channels()
            .get(section)
            .and_then(|entry| entry.events.iter().find(|view| view.start_time() > after))
    }

    pub fn channel(&self, channel_id: &ChannelId) -> Option<&ChannelEntry> {
        self.entries
            .iter()
            .find(|entry| &entry.channel.id == channel_id)
    }

    pub fn all_channel_ids(&self) -> Vec<ChannelId> {
        self.entries
            .iter()
            .map(|entry| entry.channel.id.clone())
            .collect()
    }

    pub fn filter_channel_ids(&self) -> Vec<ChannelId> {
        self.filter
            .as_ref()
            .map(|filter| filter.channel_ids.clone())
            .unwrap_or_default()
    }

    /// Size of the unfiltered catalog.
    pub fn channel_count(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[ChannelEntry] {
        &self.entries
    }
}
