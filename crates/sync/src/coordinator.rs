//! One synchronization round: concurrent fetches joined at a single barrier.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use gridguide_core::{
    Channel, ChannelId, ChannelListFilter, DateRange, Event, FetchSource, RecordingStatus,
    SyncError,
};
use gridguide_runtime_config::SyncSettings;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::retry::{RetryPolicy, retry_fetch};
use crate::source::GuideSource;

/// Which sources a round fetches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundPlan {
    pub channels: bool,
    pub events: bool,
    pub recording_statuses: bool,
    pub channel_list_filter: bool,
}

impl RoundPlan {
    pub fn full() -> Self {
        Self {
            channels: true,
            events: true,
            recording_statuses: true,
            channel_list_filter: true,
        }
    }

    /// Scroll and zoom: new event slice plus fresh statuses for it.
    pub fn viewport() -> Self {
        Self {
            events: true,
            recording_statuses: true,
            ..Self::default()
        }
    }

    pub fn events_only() -> Self {
        Self {
            events: true,
            ..Self::default()
        }
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            channels: self.channels || other.channels,
            events: self.events || other.events,
            recording_statuses: self.recording_statuses || other.recording_statuses,
            channel_list_filter: self.channel_list_filter || other.channel_list_filter,
        }
    }

    pub fn includes(&self, source: FetchSource) -> bool {
        match source {
            FetchSource::Channels => self.channels,
            FetchSource::Events => self.events,
            FetchSource::RecordingStatuses => self.recording_statuses,
            FetchSource::ChannelListFilter => self.channel_list_filter,
        }
    }

    pub fn sources(&self) -> Vec<FetchSource> {
        FetchSource::ALL
            .into_iter()
            .filter(|source| self.includes(*source))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sources().is_empty()
    }

    fn without(mut self, source: FetchSource) -> Self {
        match source {
            FetchSource::Channels => self.channels = false,
            FetchSource::Events => self.events = false,
            FetchSource::RecordingStatuses => self.recording_statuses = false,
            FetchSource::ChannelListFilter => self.channel_list_filter = false,
        }
        self
    }
}

#[derive(Debug, Clone)]
pub struct RoundRequest {
    pub epoch: u64,
    pub plan: RoundPlan,
    /// Channels whose events are fetched; events are skipped when empty.
    pub channels: Vec<Channel>,
    pub range: DateRange,
}

/// Results of every fetch in a round, available only after all of them
/// completed, failed or timed out.
#[derive(Debug, Clone, Default)]
pub struct JoinedRound {
    pub epoch: u64,
    /// Sources actually issued.
    pub plan: RoundPlan,
    pub requested_channels: Vec<ChannelId>,
    pub range: Option<DateRange>,
    pub channels: Option<Vec<Channel>>,
    pub events: Option<HashMap<ChannelId, Vec<Event>>>,
    pub recording_statuses: Option<Vec<RecordingStatus>>,
    pub channel_list_filter: Option<Option<ChannelListFilter>>,
    pub failures: Vec<SyncError>,
}

impl JoinedRound {
    pub fn succeeded(&self, source: FetchSource) -> bool {
        match source {
            FetchSource::Channels => self.channels.is_some(),
            FetchSource::Events => self.events.is_some(),
            FetchSource::RecordingStatuses => self.recording_statuses.is_some(),
            FetchSource::ChannelListFilter => self.channel_list_filter.is_some(),
        }
    }

    /// Every issued fetch failed.
    pub fn is_total_failure(&self) -> bool {
        let sources = self.plan.sources();
        !sources.is_empty() && sources.iter().all(|source| !self.succeeded(*source))
    }

    fn store(&mut self, output: FetchOutput) {
        match output {
            FetchOutput::Channels(channels) => self.channels = Some(channels),
            FetchOutput::Events(events) => self.events = Some(events),
            FetchOutput::RecordingStatuses(statuses) => self.recording_statuses = Some(statuses),
            FetchOutput::ChannelListFilter(filter) => self.channel_list_filter = Some(filter),
        }
    }
}

enum FetchOutput {
    Channels(Vec<Channel>),
    Events(HashMap<ChannelId, Vec<Event>>),
    RecordingStatuses(Vec<RecordingStatus>),
    ChannelListFilter(Option<ChannelListFilter>),
}

/// Everything a single spawned fetch needs, owned so the task is `'static`.
struct Fetch {
    source: Arc<dyn GuideSource>,
    retry: RetryPolicy,
    timeout: Duration,
    preference_key: String,
    channels: Vec<Channel>,
    range: DateRange,
}

impl Fetch {
    async fn run(self, data_source: FetchSource) -> Result<FetchOutput, SyncError> {
        let attempt = async {
            match data_source {
                FetchSource::Channels => {
                    retry_fetch(data_source, &self.retry, || self.source.fetch_channels())
                        .await
                        .map(FetchOutput::Channels)
                }
                FetchSource::Events => retry_fetch(data_source, &self.retry, || {
                    self.source.fetch_events(&self.channels, self.range)
                })
                .await
                .map(FetchOutput::Events),
                FetchSource::RecordingStatuses => {
                    retry_fetch(data_source, &self.retry, || {
                        self.source.fetch_recording_statuses()
                    })
                    .await
                    .map(FetchOutput::RecordingStatuses)
                }
                FetchSource::ChannelListFilter => retry_fetch(data_source, &self.retry, || {
                    self.source.fetch_channel_list_filter(&self.preference_key)
                })
                .await
                .map(FetchOutput::ChannelListFilter),
            }
        };

        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(SyncError::FetchFailure {
                data_source,
                reason: format!("{e:#}"),
            }),
            Err(_) => Err(SyncError::FetchTimedOut {
                data_source,
                after_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

pub struct FetchCoordinator {
    source: Arc<dyn GuideSource>,
    retry: RetryPolicy,
    timeout: Duration,
    preference_key: String,
}

impl FetchCoordinator {
    pub fn new(source: Arc<dyn GuideSource>, settings: &SyncSettings) -> Self {
        Self {
            source,
            retry: RetryPolicy::from_settings(settings),
            timeout: Duration::from_secs(settings.fetch_timeout_secs),
            preference_key: settings.preference_key(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn preference_key(&self) -> &str {
        &self.preference_key
    }

    /// Issue every planned fetch concurrently and wait for all of them.
    ///
    /// Never fails as a whole: each failed, timed out or panicked fetch is
    /// recorded in [`JoinedRound::failures`] and its slot stays `None`.
    pub async fn sync_window(&self, request: RoundRequest) -> JoinedRound {
        let mut plan = request.plan;
        if plan.events && request.channels.is_empty() {
            plan = plan.without(FetchSource::Events);
        }

        let mut round = JoinedRound {
            epoch: request.epoch,
            plan,
            requested_channels: request.channels.iter().map(|c| c.id.clone()).collect(),
            range: Some(request.range),
            ..JoinedRound::default()
        };

        let mut set = JoinSet::new();
        for data_source in plan.sources() {
            let fetch = Fetch {
                source: Arc::clone(&self.source),
                retry: self.retry.clone(),
                timeout: self.timeout,
                preference_key: self.preference_key.clone(),
                channels: if data_source == FetchSource::Events {
                    request.channels.clone()
                } else {
                    Vec::new()
                },
                range: request.range,
            };
            set.spawn(async move { (data_source, fetch.run(data_source).await) });
        }

        let mut reported = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((data_source, Ok(output))) => {
                    reported.push(data_source);
                    round.store(output);
                }
                Ok((data_source, Err(e))) => {
                    reported.push(data_source);
                    warn!("Round {}: {}", request.epoch, e);
                    round.failures.push(e);
                }
                Err(e) => warn!("Round {}: fetch task ended abnormally: {}", request.epoch, e),
            }
        }

        for data_source in plan.sources() {
            if !reported.contains(&data_source) {
                round.failures.push(SyncError::FetchFailure {
                    data_source,
                    reason: "fetch task panicked".to_string(),
                });
            }
        }
        round.failures.sort_by_key(|e| e.fetch_source());

        debug!(
            "Round {} joined: {} sources, {} failures",
            request.epoch,
            plan.sources().len(),
            round.failures.len()
        );
        round
    }
}
