use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use gridguide_core::testing::{bounds, channel};
use gridguide_core::{
    Channel, ChannelId, ChannelListFilter, DateRange, Event, EventId, RecordingStatus,
};
use gridguide_runtime_config::{LayoutSettings, SyncSettings, WindowSettings};
use gridguide_sync::{ControllerSettings, GuideSource, SyncController};

/// A source whose answers and failures are steered by the test.
///
/// Every requested channel gets one event `<channel>-e`, spanning the start of
/// the requested range, titled after the call number that produced it.
#[derive(Default)]
pub struct ScriptedSource {
    pub channels: Mutex<Vec<Channel>>,
    pub statuses: Mutex<Vec<RecordingStatus>>,
    pub filter: Mutex<Option<ChannelListFilter>>,
    pub event_delays: Mutex<VecDeque<Duration>>,
    pub event_calls: AtomicU32,
    pub fail_channels: AtomicBool,
    pub fail_events: AtomicBool,
    pub fail_statuses: AtomicBool,
    pub fail_filter: AtomicBool,
}

impl ScriptedSource {
    pub fn with_channels(names: &[(&str, &str)]) -> Arc<Self> {
        let source = Self::default();
        *source.channels.lock().expect("lock") =
            names.iter().map(|(id, name)| channel(id, name)).collect();
        Arc::new(source)
    }

    pub fn fail_all(&self, fail: bool) {
        for flag in [
            &self.fail_channels,
            &self.fail_events,
            &self.fail_statuses,
            &self.fail_filter,
        ] {
            flag.store(fail, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl GuideSource for ScriptedSource {
    async fn fetch_channels(&self) -> Result<Vec<Channel>> {
        if self.fail_channels.load(Ordering::SeqCst) {
            bail!("catalog unavailable");
        }
        Ok(self.channels.lock().expect("lock").clone())
    }

    async fn fetch_events(
        &self,
        channels: &[Channel],
        range: DateRange,
    ) -> Result<HashMap<ChannelId, Vec<Event>>> {
        let call = self.event_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = self.event_delays.lock().expect("lock").pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_events.load(Ordering::SeqCst) {
            bail!("epg unavailable");
        }
        Ok(channels
            .iter()
            .map(|c| {
                let event = Event {
                    id: EventId::new(format!("{}-e", c.id)),
                    channel_id: c.id.clone(),
                    start_time: range.start,
                    end_time: range.start + chrono::Duration::hours(1),
                    title: format!("call {call}"),
                };
                (c.id.clone(), vec![event])
            })
            .collect())
    }

    async fn fetch_recording_statuses(&self) -> Result<Vec<RecordingStatus>> {
        if self.fail_statuses.load(Ordering::SeqCst) {
            bail!("recorder unavailable");
        }
        Ok(self.statuses.lock().expect("lock").clone())
    }

    async fn fetch_channel_list_filter(
        &self,
        _preference_key: &str,
    ) -> Result<Option<ChannelListFilter>> {
        if self.fail_filter.load(Ordering::SeqCst) {
            bail!("preferences unavailable");
        }
        Ok(self.filter.lock().expect("lock").clone())
    }
}

pub fn settings(settle_ms: u64) -> ControllerSettings {
    ControllerSettings {
        bounds: bounds(),
        layout: LayoutSettings::default(),
        window: WindowSettings::default(),
        sync: SyncSettings {
            settle_ms,
            ..SyncSettings::default()
        },
    }
}

pub fn spawn(source: Arc<ScriptedSource>, settle_ms: u64) -> SyncController {
    let settings = settings(settle_ms);
    let geometry = Arc::new(settings.geometry());
    SyncController::spawn(settings, source, geometry).expect("controller")
}

pub fn three_channels() -> Arc<ScriptedSource> {
    ScriptedSource::with_channels(&[("ard", "Das Erste"), ("zdf", "ZDF"), ("arte", "Arte")])
}
