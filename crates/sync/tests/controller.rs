mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{ScriptedSource, spawn, three_channels};
use gridguide_core::testing::{at, channel, status};
use gridguide_core::{
    ChannelId, ChannelListFilter, EventId, FetchSource, GuideSnapshot, JumpAnchor,
    RecordingState, SyncError, SyncState,
};
use gridguide_sync::{FilterSelection, ViewportRequest};

fn viewport(scroll_offset_x: f64) -> ViewportRequest {
    ViewportRequest::new(0.0, 300.0, 1.0).with_horizontal(scroll_offset_x, 1_200.0)
}

fn titles(snapshot: &GuideSnapshot) -> Vec<String> {
    snapshot
        .channels
        .iter()
        .flat_map(|entry| entry.events.iter().map(|view| view.event.title.clone()))
        .collect()
}

fn status_of(snapshot: &GuideSnapshot, event_id: &str) -> Option<RecordingState> {
    snapshot
        .channels
        .iter()
        .flat_map(|entry| entry.events.iter())
        .find(|view| view.id() == &EventId::new(event_id))
        .and_then(|view| view.recording_status.as_ref())
        .map(|s| s.state)
}

fn channel_ids(snapshot: &GuideSnapshot) -> Vec<&str> {
    snapshot
        .channels
        .iter()
        .map(|entry| entry.id().as_str())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn stale_round_is_discarded_when_a_newer_round_finishes_first() {
    let source = three_channels();
    let controller = spawn(source.clone(), 0);
    controller.request_window_change(viewport(0.0)).expect("request");
    let bootstrap = controller.settled().await.expect("bootstrap");
    assert_eq!(titles(&bootstrap), vec!["call 1"; 3]);

    source
        .event_delays
        .lock()
        .expect("lock")
        .push_back(Duration::from_secs(10));

    controller.request_window_change(viewport(400.0)).expect("request");
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(controller.current_snapshot().state.is_loading());

    controller.request_window_change(viewport(800.0)).expect("request");
    let snapshot = controller.settled().await.expect("snapshot");

    assert_eq!(snapshot.state, SyncState::Ready { epoch: 4 });
    assert_eq!(titles(&snapshot), vec!["call 3"; 3]);
    assert_eq!(snapshot.visible_range.map(|r| r.start), Some(at(2)));
    assert_eq!(source.event_calls.load(Ordering::SeqCst), 3);

    let stats = controller.stats();
    assert_eq!(stats.rounds_launched, 4);
    assert_eq!(stats.rounds_applied, 3);
    assert_eq!(stats.rounds_discarded, 1);
}

#[tokio::test(start_paused = true)]
async fn failed_status_fetch_keeps_previous_statuses_on_new_events() {
    let source = three_channels();
    *source.statuses.lock().expect("lock") = vec![status("ard-e", RecordingState::Scheduled)];
    let controller = spawn(source.clone(), 0);
    controller.request_window_change(viewport(0.0)).expect("request");
    let bootstrap = controller.settled().await.expect("bootstrap");
    assert_eq!(status_of(&bootstrap, "ard-e"), Some(RecordingState::Scheduled));

    source.fail_statuses.store(true, Ordering::SeqCst);
    controller.refresh().expect("refresh");
    let snapshot = controller.settled().await.expect("snapshot");

    assert!(matches!(snapshot.state, SyncState::Ready { .. }));
    assert_eq!(titles(&snapshot), vec!["call 2"; 3]);
    assert_eq!(status_of(&snapshot, "ard-e"), Some(RecordingState::Scheduled));
    assert_eq!(snapshot.errors.len(), 1);
    assert_eq!(
        snapshot.errors[0].fetch_source(),
        Some(FetchSource::RecordingStatuses)
    );
}

#[tokio::test(start_paused = true)]
async fn total_failure_keeps_the_guide_and_reports_every_source() {
    let source = three_channels();
    let controller = spawn(source.clone(), 0);
    controller.request_window_change(viewport(0.0)).expect("request");
    controller.settled().await.expect("bootstrap");

    source.fail_all(true);
    controller.refresh().expect("refresh");
    let snapshot = controller.settled().await.expect("snapshot");

    assert!(matches!(snapshot.state, SyncState::Ready { .. }));
    assert_eq!(channel_ids(&snapshot), vec!["ard", "zdf", "arte"]);
    assert_eq!(titles(&snapshot), vec!["call 1"; 3]);
    let failed: Vec<_> = snapshot
        .errors
        .iter()
        .filter_map(SyncError::fetch_source)
        .collect();
    assert_eq!(failed, FetchSource::ALL.to_vec());
    assert_eq!(controller.stats().fetch_failures, 4);

    source.fail_all(false);
    controller.refresh().expect("refresh");
    let recovered = controller.settled().await.expect("snapshot");
    assert!(recovered.errors.is_empty());
    assert_eq!(titles(&recovered), vec!["call 3"; 3]);
}

#[tokio::test(start_paused = true)]
async fn rapid_requests_coalesce_into_one_round() {
    let source = three_channels();
    let controller = spawn(source.clone(), 50);
    controller.request_window_change(viewport(0.0)).expect("request");
    controller.settled().await.expect("bootstrap");
    let launched = controller.stats().rounds_launched;

    for step in 1..=5 {
        controller
            .request_window_change(viewport(f64::from(step) * 100.0))
            .expect("request");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let snapshot = controller.settled().await.expect("snapshot");

    assert_eq!(controller.stats().rounds_launched, launched + 1);
    assert_eq!(
        snapshot.visible_range.map(|r| r.start),
        Some(at(0) + chrono::Duration::minutes(75))
    );
}

#[tokio::test(start_paused = true)]
async fn pushed_statuses_survive_merges_until_a_full_listing_replaces_them() {
    let source = three_channels();
    let controller = spawn(source.clone(), 0);
    controller.request_window_change(viewport(0.0)).expect("request");
    controller.settled().await.expect("bootstrap");

    controller
        .push_recording_statuses(vec![
            status("zdf-e", RecordingState::Recording),
            status("unknown-e", RecordingState::Scheduled),
        ])
        .expect("push");
    let snapshot = controller.settled().await.expect("snapshot");

    assert_eq!(status_of(&snapshot, "zdf-e"), Some(RecordingState::Recording));
    assert_eq!(status_of(&snapshot, "ard-e"), None);
    assert_eq!(controller.stats().status_pushes, 1);

    controller.request_window_change(viewport(2_000.0)).expect("request");
    let scrolled = controller.settled().await.expect("snapshot");
    assert_ne!(titles(&scrolled), titles(&snapshot));
    assert_eq!(status_of(&scrolled, "zdf-e"), None);
}

#[tokio::test(start_paused = true)]
async fn fetched_channel_list_and_search_narrow_visible_channels() {
    let source = three_channels();
    *source.filter.lock().expect("lock") = Some(ChannelListFilter {
        id: "public".to_string(),
        name: "Public".to_string(),
        channel_ids: vec![ChannelId::new("ard"), ChannelId::new("zdf")],
    });
    let controller = spawn(source.clone(), 0);
    controller.request_window_change(viewport(0.0)).expect("request");
    let snapshot = controller.settled().await.expect("bootstrap");
    assert_eq!(channel_ids(&snapshot), vec!["ard", "zdf"]);

    controller
        .request_window_change(viewport(0.0).with_search(" Z d "))
        .expect("request");
    let snapshot = controller.settled().await.expect("snapshot");
    assert_eq!(channel_ids(&snapshot), vec!["zdf"]);

    controller
        .request_window_change(
            viewport(0.0)
                .with_search("")
                .with_filter(FilterSelection::AllChannels),
        )
        .expect("request");
    let snapshot = controller.settled().await.expect("snapshot");
    assert_eq!(channel_ids(&snapshot), vec!["ard", "zdf", "arte"]);

    controller.request_window_change(viewport(0.0)).expect("request");
    let snapshot = controller.settled().await.expect("snapshot");
    assert_eq!(snapshot.channels.len(), 3);

    // Refresh re-reads the stored preference.
    controller.refresh().expect("refresh");
    let snapshot = controller.settled().await.expect("snapshot");
    assert_eq!(channel_ids(&snapshot), vec!["ard", "zdf"]);
}

#[tokio::test(start_paused = true)]
async fn jump_marks_follow_the_visible_time_range() {
    let controller = spawn(three_channels(), 0);
    controller.request_window_change(viewport(0.0)).expect("request");
    let snapshot = controller.settled().await.expect("snapshot");
    assert!(snapshot.jump_marks.left.is_none());
    assert_eq!(
        snapshot.jump_marks.right.map(|m| m.anchor),
        Some(JumpAnchor::Now)
    );
    assert!(!snapshot.jump_marks.current_time_visible);

    // 400 points per hour at zoom 1: x = 1_600 shows 04:00 to 07:00.
    controller.request_window_change(viewport(1_600.0)).expect("request");
    let snapshot = controller.settled().await.expect("snapshot");
    assert!(snapshot.jump_marks.current_time_visible);
    assert_eq!(
        snapshot.jump_marks.right.map(|m| m.anchor),
        Some(JumpAnchor::PrimeTime)
    );

    controller.request_window_change(viewport(4_000.0)).expect("request");
    let snapshot = controller.settled().await.expect("snapshot");
    assert_eq!(
        snapshot.jump_marks.left.map(|m| (m.anchor, m.target)),
        Some((JumpAnchor::PrimeTime, at(8)))
    );
    assert!(snapshot.jump_marks.right.is_none());
}

#[tokio::test(start_paused = true)]
async fn shutdown_aborts_rounds_in_flight() {
    let source = ScriptedSource::with_channels(&[("ard", "Das Erste")]);
    let controller = spawn(source.clone(), 0);
    controller.request_window_change(viewport(0.0)).expect("request");
    controller.settled().await.expect("bootstrap");

    source
        .event_delays
        .lock()
        .expect("lock")
        .push_back(Duration::from_secs(3_600));
    controller.refresh().expect("refresh");
    tokio::time::sleep(Duration::from_millis(1)).await;

    assert_eq!(controller.stats().rounds_applied, 2);
    let mut snapshots = controller.subscribe();
    controller.shutdown().await;

    assert_eq!(
        snapshots.borrow_and_update().state,
        SyncState::Loading { epoch: 3 }
    );
    assert!(snapshots.changed().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn refresh_overtaken_by_a_scroll_still_reloads_the_catalog() {
    let source = three_channels();
    let controller = spawn(source.clone(), 0);
    controller.request_window_change(viewport(0.0)).expect("request");
    controller.settled().await.expect("bootstrap");

    source
        .channels
        .lock()
        .expect("lock")
        .push(channel("kika", "KiKA"));
    *source.statuses.lock().expect("lock") = vec![status("kika-e", RecordingState::Scheduled)];
    source
        .event_delays
        .lock()
        .expect("lock")
        .push_back(Duration::from_secs(5));

    controller.refresh().expect("refresh");
    tokio::time::sleep(Duration::from_millis(1)).await;
    controller.request_window_change(viewport(400.0)).expect("request");
    let snapshot = controller.settled().await.expect("snapshot");

    assert_eq!(channel_ids(&snapshot), vec!["ard", "zdf", "arte", "kika"]);
    assert_eq!(status_of(&snapshot, "kika-e"), Some(RecordingState::Scheduled));
    assert_eq!(snapshot.visible_range.map(|r| r.start), Some(at(1)));
    assert!(snapshot.errors.is_empty());

    let stats = controller.stats();
    assert_eq!(stats.rounds_discarded, 1);
}

#[tokio::test(start_paused = true)]
async fn search_overtaking_a_scroll_keeps_the_status_listing() {
    let source = three_channels();
    let controller = spawn(source.clone(), 0);
    controller.request_window_change(viewport(0.0)).expect("request");
    controller.settled().await.expect("bootstrap");

    *source.statuses.lock().expect("lock") = vec![status("zdf-e", RecordingState::Recording)];
    source
        .event_delays
        .lock()
        .expect("lock")
        .push_back(Duration::from_secs(5));

    controller.request_window_change(viewport(400.0)).expect("request");
    tokio::time::sleep(Duration::from_millis(1)).await;
    controller
        .request_window_change(viewport(400.0).with_search("zdf"))
        .expect("request");
    let snapshot = controller.settled().await.expect("snapshot");

    assert_eq!(channel_ids(&snapshot), vec!["zdf"]);
    assert_eq!(status_of(&snapshot, "zdf-e"), Some(RecordingState::Recording));
    assert_eq!(controller.stats().rounds_discarded, 1);
}

#[tokio::test(start_paused = true)]
async fn rapid_scrolling_never_exceeds_the_round_cap() {
    let source = three_channels();
    let controller = spawn(source.clone(), 50);
    controller.request_window_change(viewport(0.0)).expect("request");
    controller.settled().await.expect("bootstrap");
    let booted = controller.stats().rounds_launched;

    {
        let mut delays = source.event_delays.lock().expect("lock");
        delays.push_back(Duration::from_secs(10));
        delays.push_back(Duration::from_secs(10));
    }
    for offset in [400.0, 800.0, 1_200.0, 1_600.0] {
        controller.request_window_change(viewport(offset)).expect("request");
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(controller.stats().rounds_launched - booted <= 2);
    }
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(controller.stats().rounds_launched - booted, 2);
    assert!(controller.current_snapshot().state.is_loading());

    let snapshot = controller.settled().await.expect("snapshot");
    assert_eq!(snapshot.visible_range.map(|r| r.start), Some(at(4)));
    assert_eq!(titles(&snapshot), vec!["call 4"; 3]);

    let stats = controller.stats();
    assert_eq!(stats.rounds_launched - booted, 3);
    assert_eq!(stats.rounds_discarded, 2);
}
