//! The sync controller: a single driver task owns the guide store and turns
//! viewport changes into fetch rounds, discarding rounds that were overtaken.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use gridguide_core::{
    BoundsError, ChannelEventStore, ChannelWindow, DateBounds, DateRange, GuideSnapshot,
    HourWidthGeometry, JumpMarkEngine, RecordingStatus, RecordingStatusBook, SearchQuery,
    SyncError, SyncState, TimelineGeometry, WindowCalculator,
};
use gridguide_runtime_config::{GuideConfig, LayoutSettings, SyncSettings, WindowSettings};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};

use crate::bounds::{bounds_from_settings, window_calculator};
use crate::coordinator::{FetchCoordinator, JoinedRound, RoundPlan, RoundRequest};
use crate::request::ViewportRequest;
use crate::source::GuideSource;

pub type SnapshotCallback = Box<dyn Fn(&GuideSnapshot) + Send + Sync>;

/// Everything the controller needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub bounds: DateBounds,
    pub layout: LayoutSettings,
    pub window: WindowSettings,
    pub sync: SyncSettings,
}

impl ControllerSettings {
    pub fn from_config(now: DateTime<Utc>, config: &GuideConfig) -> Result<Self, BoundsError> {
        Ok(Self {
            bounds: bounds_from_settings(now, &config.bounds)?,
            layout: config.layout.clone(),
            window: config.window.clone(),
            sync: config.sync.clone(),
        })
    }

    /// Linear timeline starting at the earliest addressable time.
    pub fn geometry(&self) -> HourWidthGeometry {
        HourWidthGeometry::new(self.bounds.min_time, self.layout.hour_width)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub rounds_launched: u64,
    pub rounds_applied: u64,
    pub rounds_discarded: u64,
    pub fetch_failures: u64,
    pub status_pushes: u64,
}

#[derive(Debug, Default)]
struct StatsCounters {
    rounds_launched: AtomicU64,
    rounds_applied: AtomicU64,
    rounds_discarded: AtomicU64,
    fetch_failures: AtomicU64,
    status_pushes: AtomicU64,
}

impl StatsCounters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SyncStats {
        SyncStats {
            rounds_launched: self.rounds_launched.load(Ordering::Relaxed),
            rounds_applied: self.rounds_applied.load(Ordering::Relaxed),
            rounds_discarded: self.rounds_discarded.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            status_pushes: self.status_pushes.load(Ordering::Relaxed),
        }
    }
}

/// Driver bookkeeping used to tell when requested work has finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Progress {
    handled: u64,
    settled: bool,
}

enum Command {
    WindowChange(Box<ViewportRequest>),
    Refresh,
    PushStatuses(Vec<RecordingStatus>),
    OnSnapshotReady(SnapshotCallback),
    Shutdown,
}

/// Handle to the driver task. Dropping it stops the driver.
pub struct SyncController {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<Arc<GuideSnapshot>>,
    progress: watch::Receiver<Progress>,
    requested: AtomicU64,
    stats: Arc<StatsCounters>,
    driver: JoinHandle<()>,
}

impl SyncController {
    /// Start the driver task on the current tokio runtime.
    pub fn spawn(
        settings: ControllerSettings,
        source: Arc<dyn GuideSource>,
        geometry: Arc<dyn TimelineGeometry>,
    ) -> Result<Self, BoundsError> {
        let calculator = window_calculator(settings.bounds, &settings.window)?;
        let (commands, receiver) = mpsc::unbounded_channel();
        let (publisher, snapshots) = watch::channel(Arc::new(GuideSnapshot::default()));
        let (progress_tx, progress) = watch::channel(Progress {
            handled: 0,
            settled: true,
        });
        let stats = Arc::new(StatsCounters::default());

        let driver = Driver {
            coordinator: Arc::new(FetchCoordinator::new(source, &settings.sync)),
            calculator,
            marks: JumpMarkEngine::new(settings.bounds),
            geometry,
            settle: Duration::from_millis(settings.sync.settle_ms),
            max_in_flight: settings.sync.max_rounds_in_flight.max(1),
            layout: settings.layout,
            store: ChannelEventStore::new(),
            book: RecordingStatusBook::new(),
            viewport: ViewportRequest::default(),
            epoch: 0,
            handled: 0,
            needs_catalog: true,
            filter_pinned: false,
            unapplied: RoundPlan::default(),
            pending: None,
            latest: None,
            callbacks: Vec::new(),
            publisher,
            progress: progress_tx,
            stats: Arc::clone(&stats),
        };
        let driver = tokio::spawn(driver.run(receiver));

        Ok(Self {
            commands,
            snapshots,
            progress,
            requested: AtomicU64::new(0),
            stats,
            driver,
        })
    }

    fn send(&self, command: Command) -> Result<(), SyncError> {
        self.commands
            .send(command)
            .map_err(|_| SyncError::ControllerClosed)
    }

    fn request(&self, command: Command) -> Result<(), SyncError> {
        self.send(command)?;
        self.requested.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    pub fn request_window_change(&self, request: ViewportRequest) -> Result<(), SyncError> {
        self.request(Command::WindowChange(Box::new(request)))
    }

    /// Refetch every source, including the catalog and the channel list preference.
    pub fn refresh(&self) -> Result<(), SyncError> {
        self.request(Command::Refresh)
    }

    pub fn push_recording_statuses(&self, statuses: Vec<RecordingStatus>) -> Result<(), SyncError> {
        self.request(Command::PushStatuses(statuses))
    }

    /// Called on the driver task once per applied round.
    pub fn on_snapshot_ready<F>(&self, callback: F) -> Result<(), SyncError>
    where
        F: Fn(&GuideSnapshot) + Send + Sync + 'static,
    {
        self.send(Command::OnSnapshotReady(Box::new(callback)))
    }

    pub fn current_snapshot(&self) -> Arc<GuideSnapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<GuideSnapshot>> {
        self.snapshots.clone()
    }

    pub fn stats(&self) -> SyncStats {
        self.stats.snapshot()
    }

    /// Wait until every request sent so far has been handled and no round is
    /// in flight or pending, then return the latest snapshot.
    pub async fn settled(&self) -> Result<Arc<GuideSnapshot>, SyncError> {
        let target = self.requested.load(Ordering::SeqCst);
        let mut progress = self.progress.clone();
        progress
            .wait_for(|p| p.settled && p.handled >= target)
            .await
            .map_err(|_| SyncError::ControllerClosed)?;
        Ok(self.current_snapshot())
    }

    /// Stop the driver and abort in-flight rounds.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Err(e) = self.driver.await {
            warn!("Sync driver ended abnormally: {}", e);
        }
    }
}

struct Pending {
    plan: RoundPlan,
    due: Instant,
    follow_up: bool,
}

/// Viewport-derived context of the most recently launched round.
#[derive(Clone, Copy)]
struct LaunchedRound {
    epoch: u64,
    follow_up: bool,
    visible_range: Option<DateRange>,
    fetch_range: DateRange,
}

struct Driver {
    coordinator: Arc<FetchCoordinator>,
    calculator: WindowCalculator,
    marks: JumpMarkEngine,
    geometry: Arc<dyn TimelineGeometry>,
    layout: LayoutSettings,
    settle: Duration,
    max_in_flight: usize,
    store: ChannelEventStore,
    book: RecordingStatusBook,
    viewport: ViewportRequest,
    epoch: u64,
    handled: u64,
    /// Catalog not loaded yet; every round also fetches channels and the list preference.
    needs_catalog: bool,
    /// The user picked a channel list locally; fetched preferences are ignored until refresh.
    filter_pinned: bool,
    /// Sources planned by launched rounds that no applied round has fetched yet.
    unapplied: RoundPlan,
    pending: Option<Pending>,
    latest: Option<LaunchedRound>,
    callbacks: Vec<SnapshotCallback>,
    publisher: watch::Sender<Arc<GuideSnapshot>>,
    progress: watch::Sender<Progress>,
    stats: Arc<StatsCounters>,
}

impl Driver {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut rounds: JoinSet<JoinedRound> = JoinSet::new();
        debug!("Sync driver started");

        loop {
            self.report_progress(&rounds);
            let due = self
                .pending
                .as_ref()
                .filter(|_| rounds.len() < self.max_in_flight)
                .map(|pending| pending.due);

            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },

                Some(joined) = rounds.join_next(), if !rounds.is_empty() => match joined {
                    Ok(round) => self.complete(round),
                    Err(e) => error!("Sync round task failed: {}", e),
                },

                _ = sleep_until(due.unwrap_or_else(Instant::now)), if due.is_some() => {
                    self.launch(&mut rounds);
                }
            }
        }

        if !rounds.is_empty() {
            info!("Sync driver stopping, aborting {} in-flight rounds", rounds.len());
        }
        rounds.shutdown().await;
        debug!("Sync driver stopped");
    }

    fn report_progress(&self, rounds: &JoinSet<JoinedRound>) {
        let current = Progress {
            handled: self.handled,
            settled: rounds.is_empty() && self.pending.is_none(),
        };
        self.progress.send_if_modified(|progress| {
            let changed = *progress != current;
            *progress = current;
            changed
        });
    }

    fn handle(&mut self, command: Command) {
        if matches!(
            command,
            Command::WindowChange(_) | Command::Refresh | Command::PushStatuses(_)
        ) {
            self.handled += 1;
        }
        match command {
            Command::WindowChange(request) => self.window_change(*request),
            Command::Refresh => {
                self.filter_pinned = false;
                self.schedule(RoundPlan::full(), false);
            }
            Command::PushStatuses(statuses) => self.push_statuses(statuses),
            Command::OnSnapshotReady(callback) => self.callbacks.push(callback),
            Command::Shutdown => {}
        }
    }

    fn window_change(&mut self, mut request: ViewportRequest) {
        let geometry_changed = !self.viewport.same_geometry(&request);

        if let Some(text) = request.search_text.take() {
            if self.store.search_query() != &SearchQuery::new(&text) {
                debug!("Search text changed to {:?}", text);
                self.store.set_search_query(&text);
            }
        }
        if let Some(selection) = request.filter.take() {
            let filter = selection.into_filter();
            debug!(
                "Channel list selected: {}",
                filter.as_ref().map_or("all channels", |f| f.name.as_str())
            );
            self.store.set_filter(filter);
            self.filter_pinned = true;
        }

        self.viewport = request;
        let plan = if geometry_changed {
            RoundPlan::viewport()
        } else {
            RoundPlan::events_only()
        };
        self.schedule(plan, false);
    }

    fn push_statuses(&mut self, statuses: Vec<RecordingStatus>) {
        StatsCounters::bump(&self.stats.status_pushes, 1);
        let applied = self.store.apply_recording_statuses(statuses.iter());
        debug!(
            "Recording status push: {} statuses, {} matched loaded events",
            statuses.len(),
            applied
        );
        self.book.upsert_all(statuses);
        self.schedule(RoundPlan::events_only(), false);
    }

    /// Coalesce `plan` into the pending round and restart the settle delay.
    fn schedule(&mut self, plan: RoundPlan, follow_up: bool) {
        let plan = if self.needs_catalog {
            plan.union(RoundPlan {
                channels: true,
                channel_list_filter: true,
                ..RoundPlan::default()
            })
        } else {
            plan
        };
        let delay = if follow_up { Duration::ZERO } else { self.settle };
        let due = Instant::now() + delay;

        match &mut self.pending {
            Some(pending) => {
                pending.plan = pending.plan.union(plan);
                pending.due = due;
                pending.follow_up &= follow_up;
            }
            None => {
                self.pending = Some(Pending {
                    plan,
                    due,
                    follow_up,
                });
            }
        }
    }

    fn channel_window(&self, total: usize) -> ChannelWindow {
        let window = WindowCalculator::compute_channel_window(
            self.viewport.scroll_offset_y,
            self.viewport.viewport_height,
            self.layout.row_height,
            total,
        );
        let focus = self
            .viewport
            .focus_channel
            .as_ref()
            .and_then(|id| self.store.channel_section(id));
        match focus {
            Some(section) if !window.contains(section) => window.centered_on(section, total),
            _ => window,
        }
    }

    fn visible_range(&self) -> Option<DateRange> {
        self.geometry.date_range_for_viewport(
            self.viewport.scroll_offset_x,
            self.viewport.viewport_width,
            self.layout.clamp_zoom(self.viewport.zoom_scale),
        )
    }

    fn launch(&mut self, rounds: &mut JoinSet<JoinedRound>) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        self.epoch += 1;
        let epoch = self.epoch;
        // A newer round discards older ones, so it has to cover their sources too.
        let plan = pending.plan.union(self.unapplied);
        self.unapplied = plan;

        let window = self.channel_window(self.store.visible_count());
        let channels = self.store.channels_in_window(&window);
        let visible_range = self.visible_range();
        let selection = visible_range.map_or(self.calculator.bounds().current_time, |r| r.start);
        let fetch_range = self.calculator.compute_date_range(selection);
        if let Some(visible) = &visible_range
            && !self.calculator.covers_visible(&fetch_range, visible)
        {
            warn!(
                "Round {}: fetch range {} does not cover visible range {}",
                epoch, fetch_range, visible
            );
        }

        debug!(
            "Launching round {}: {:?}, {} channels, {}",
            epoch,
            plan.sources(),
            channels.len(),
            fetch_range
        );
        StatsCounters::bump(&self.stats.rounds_launched, 1);
        self.latest = Some(LaunchedRound {
            epoch,
            follow_up: pending.follow_up,
            visible_range,
            fetch_range,
        });

        let request = RoundRequest {
            epoch,
            plan,
            channels,
            range: fetch_range,
        };
        let coordinator = Arc::clone(&self.coordinator);
        rounds.spawn(async move { coordinator.sync_window(request).await });

        self.publisher.send_modify(|snapshot| {
            Arc::make_mut(snapshot).state = SyncState::Loading { epoch };
        });
    }

    fn complete(&mut self, mut round: JoinedRound) {
        let launched = self.latest.filter(|latest| latest.epoch == round.epoch);
        let Some(launched) = launched else {
            StatsCounters::bump(&self.stats.rounds_discarded, 1);
            debug!(
                "{}",
                SyncError::StaleRoundDiscarded {
                    epoch: round.epoch,
                    latest: self.epoch,
                }
            );
            return;
        };

        StatsCounters::bump(&self.stats.rounds_applied, 1);
        self.unapplied = RoundPlan::default();
        StatsCounters::bump(&self.stats.fetch_failures, round.failures.len() as u64);
        if round.is_total_failure() {
            warn!(
                "Round {}: every fetch failed, keeping previous guide data",
                round.epoch
            );
        }

        if let Some(channels) = round.channels.take() {
            debug!("Round {}: catalog of {} channels", round.epoch, channels.len());
            self.store.set_channels(channels);
            self.needs_catalog = false;
        }
        if let Some(filter) = round.channel_list_filter.take() {
            if self.filter_pinned {
                debug!("Round {}: keeping locally selected channel list", round.epoch);
            } else {
                self.store.set_filter(filter);
            }
        }
        if let Some(events) = round.events.take() {
            for (channel_id, events) in events {
                if !self.store.merge_events(&channel_id, events) {
                    debug!(
                        "Round {}: ignoring events for unknown channel {}",
                        round.epoch, channel_id
                    );
                }
            }
        }
        if let Some(statuses) = round.recording_statuses.take() {
            self.book.replace_all(statuses);
            self.store.clear_recording_statuses();
        }
        self.store.apply_recording_statuses(self.book.iter());

        let window = self.channel_window(self.store.visible_count());
        let window_channels: Vec<_> = self
            .store
            .channels_in_window(&window)
            .into_iter()
            .map(|channel| channel.id)
            .collect();
        if !launched.follow_up
            && self.pending.is_none()
            && !window_channels.is_empty()
            && window_channels != round.requested_channels
        {
            debug!(
                "Round {}: visible channels changed, scheduling follow-up",
                round.epoch
            );
            self.schedule(RoundPlan::viewport(), true);
        }

        let jump_marks = match &launched.visible_range {
            Some(visible) => {
                if let Some(changed) = self.marks.update(visible) {
                    debug!(
                        "Jump marks: left={:?} right={:?}",
                        changed.left.map(|m| m.label()),
                        changed.right.map(|m| m.label())
                    );
                }
                self.marks.last().copied().unwrap_or_default()
            }
            None => Default::default(),
        };

        let snapshot = Arc::new(GuideSnapshot {
            epoch: round.epoch,
            state: SyncState::Ready { epoch: round.epoch },
            channels: self.store.visible_entries(),
            window,
            fetch_range: Some(launched.fetch_range),
            visible_range: launched.visible_range,
            jump_marks,
            errors: round.failures,
        });
        debug!(
            "Round {} applied: {} channels, {} events, {} errors",
            snapshot.epoch,
            snapshot.channels.len(),
            snapshot.event_count(),
            snapshot.errors.len()
        );
        self.publisher.send_replace(Arc::clone(&snapshot));
        for callback in &self.callbacks {
            callback(&snapshot);
        }
    }
}
