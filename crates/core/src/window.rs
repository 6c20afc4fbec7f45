//! Viewport → required data window.
//!
//! Rows map to channels (fixed row height), columns map to time through a
//! [`TimelineGeometry`]. The fetch window is always an explicit `[start, end)`
//! range inside the configured [`DateBounds`], however far the user scrolls.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::error::BoundsError;
use crate::marks::DateBounds;
use crate::model::DateRange;

/// Rows fetched beyond each edge of the viewport.
pub const PREFETCH_ROWS: usize = 1;

/// Contiguous half-open range of visible section indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelWindow {
    pub start: usize,
    pub end: usize,
}

impl ChannelWindow {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, section: usize) -> bool {
        self.start <= section && section < self.end
    }

    pub fn indices(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Same-sized window recentred on `section`, clamped to `[0, total)`.
    pub fn centered_on(&self, section: usize, total: usize) -> Self {
        if total == 0 {
            return Self::empty();
        }
        let len = self.len().clamp(1, total);
        let section = section.min(total - 1);
        let mut start = section.saturating_sub(len / 2);
        let end = (start + len).min(total);
        start = end.saturating_sub(len);
        Self::new(start, end)
    }
}

/// Maps horizontal scroll position to time. Supplied by the layout layer.
pub trait TimelineGeometry: Send + Sync {
    fn date_range_for_viewport(
        &self,
        scroll_offset_x: f64,
        viewport_width: f64,
        zoom_scale: f64,
    ) -> Option<DateRange>;
}

/// Linear timeline: `hour_width * zoom` points per hour starting at `origin`.
#[derive(Debug, Clone, Copy)]
pub struct HourWidthGeometry {
    pub origin: DateTime<Utc>,
    pub hour_width: f64,
}

impl HourWidthGeometry {
    pub fn new(origin: DateTime<Utc>, hour_width: f64) -> Self {
        Self { origin, hour_width }
    }

    pub fn date_at(&self, x: f64, zoom_scale: f64) -> DateTime<Utc> {
        let points_per_hour = self.hour_width * zoom_scale;
        if !points_per_hour.is_finite() || points_per_hour <= 0.0 || !x.is_finite() {
            return self.origin;
        }
        let millis = (x / points_per_hour * 3_600_000.0).round() as i64;
        self.origin + Duration::milliseconds(millis)
    }

    pub fn x_for(&self, date: DateTime<Utc>, zoom_scale: f64) -> f64 {
        let hours = (date - self.origin).num_milliseconds() as f64 / 3_600_000.0;
        hours * self.hour_width * zoom_scale
    }
}

impl TimelineGeometry for HourWidthGeometry {
    fn date_range_for_viewport(
        &self,
        scroll_offset_x: f64,
        viewport_width: f64,
        zoom_scale: f64,
    ) -> Option<DateRange> {
        let x = scroll_offset_x.max(0.0);
        DateRange::new(
            self.date_at(x, zoom_scale),
            self.date_at(x + viewport_width, zoom_scale),
        )
    }
}

#[derive(Debug, Clone)]
pub struct WindowCalculator {
    bounds: DateBounds,
    lookbehind: Duration,
    lookahead: Duration,
}

impl WindowCalculator {
    pub fn new(
        bounds: DateBounds,
        lookbehind: Duration,
        lookahead: Duration,
    ) -> Result<Self, BoundsError> {
        if lookbehind <= Duration::zero() || lookahead <= Duration::zero() {
            return Err(BoundsError::EmptyFetchWindow);
        }
        Ok(Self {
            bounds,
            lookbehind,
            lookahead,
        })
    }

    pub fn bounds(&self) -> &DateBounds {
        &self.bounds
    }

    /// Rows intersecting `[scroll_offset_y, scroll_offset_y + viewport_height]`
    /// plus [`PREFETCH_ROWS`] on each edge, clamped to `[0, total_channel_count)`.
    pub fn compute_channel_window(
        scroll_offset_y: f64,
        viewport_height: f64,
        row_height: f64,
        total_channel_count: usize,
    ) -> ChannelWindow {
        if total_channel_count == 0
            || !row_height.is_finite()
            || row_height <= 0.0
            || !scroll_offset_y.is_finite()
            || !viewport_height.is_finite()
        {
            return ChannelWindow::empty();
        }

        let last_index = total_channel_count - 1;
        let top = scroll_offset_y.max(0.0);
        let bottom = (scroll_offset_y + viewport_height.max(0.0)).max(0.0);

        // `as` saturates, so content-height overshoot lands on `usize::MAX`.
        let first_row = (top / row_height).floor() as usize;
        let last_row = (bottom / row_height).floor() as usize;

        let start = first_row.saturating_sub(PREFETCH_ROWS).min(last_index);
        let end_inclusive = last_row.saturating_add(PREFETCH_ROWS).min(last_index);
        ChannelWindow::new(start, end_inclusive.max(start) + 1)
    }

    /// Fetch range around `selection_time`, truncated to the date bounds.
    pub fn compute_date_range(&self, selection_time: DateTime<Utc>) -> DateRange {
        let selection = self.clamp_selection(selection_time);
        let start = (selection - self.lookbehind).max(self.bounds.min_time);
        let end = (selection + self.lookahead).min(self.bounds.max_time);
        DateRange { start, end }
    }

    pub fn clamp_selection(&self, selection_time: DateTime<Utc>) -> DateTime<Utc> {
        selection_time.clamp(self.bounds.min_time, self.bounds.max_time)
    }

    /// Whether `fetch` covers the in-bounds part of the `visible` range.
    pub fn covers_visible(&self, fetch: &DateRange, visible: &DateRange) -> bool {
        let start = visible.start.max(self.bounds.min_time);
        let end = visible.end.min(self.bounds.max_time);
        match DateRange::new(start, end) {
            Some(clamped) => fetch.covers(&clamped),
            None => true,
        }
    }
}
