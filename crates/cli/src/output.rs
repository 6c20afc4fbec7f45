use std::fmt::Write as _;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use gridguide_core::{ChannelWindow, GuideSnapshot, JumpMark, JumpMarks, SyncState};
use gridguide_sync::SyncStats;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
pub struct SyncReport<'a> {
    pub snapshot: &'a GuideSnapshot,
    pub stats: SyncStats,
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{rendered}");
    Ok(())
}

fn time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn describe_mark(mark: Option<&JumpMark>) -> String {
    match mark {
        Some(mark) => format!("{} ({})", mark.label(), time(mark.target)),
        None => "hidden".to_string(),
    }
}

pub fn describe_marks(marks: &JumpMarks) -> String {
    format!(
        "left: {}, right: {}, current time {}",
        describe_mark(marks.left.as_ref()),
        describe_mark(marks.right.as_ref()),
        if marks.current_time_visible {
            "visible"
        } else {
            "off screen"
        }
    )
}

pub fn describe_window(window: &ChannelWindow, total: usize) -> String {
    if window.is_empty() {
        return format!("no channels (0 of {total})");
    }
    format!(
        "channels {}..{} ({} of {})",
        window.start,
        window.end,
        window.len(),
        total
    )
}

pub fn render_snapshot(snapshot: &GuideSnapshot, stats: &SyncStats) -> String {
    let mut out = String::new();
    let state = match snapshot.state {
        SyncState::Idle => "idle",
        SyncState::Loading { .. } => "loading",
        SyncState::Ready { .. } => "ready",
    };
    let _ = writeln!(
        out,
        "Round {} ({state}), {} rounds launched, {} discarded",
        snapshot.epoch, stats.rounds_launched, stats.rounds_discarded
    );
    let _ = writeln!(
        out,
        "Window: {}",
        describe_window(&snapshot.window, snapshot.channels.len())
    );
    if let Some(range) = &snapshot.visible_range {
        let _ = writeln!(out, "Visible: {} - {}", time(range.start), time(range.end));
    }
    if let Some(range) = &snapshot.fetch_range {
        let _ = writeln!(out, "Fetched: {} - {}", time(range.start), time(range.end));
    }
    let _ = writeln!(out, "Jump marks: {}", describe_marks(&snapshot.jump_marks));
    for error in &snapshot.errors {
        let _ = writeln!(out, "Warning: {error}");
    }

    for entry in snapshot.channels.get(snapshot.window.indices()).unwrap_or_default() {
        let _ = writeln!(out, "\n{} [{}]", entry.channel.name, entry.id());
        if entry.events.is_empty() {
            let _ = writeln!(out, "  (no events)");
        }
        for view in &entry.events {
            let status = view
                .recording_status
                .as_ref()
                .map(|s| format!("  [{}]", s.state.as_str()))
                .unwrap_or_default();
            let _ = writeln!(out, "  {}  {}{}", view.timeframe(), view.event.title, status);
        }
    }
    out
}
