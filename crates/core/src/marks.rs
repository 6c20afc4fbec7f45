//! Jump marks: the nearest interesting time anchors ("now", "prime time")
//! reachable from the current viewport edges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BoundsError;
use crate::model::DateRange;

/// Addressable time universe and its special anchors, fixed at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateBounds {
    pub min_time: DateTime<Utc>,
    pub current_time: DateTime<Utc>,
    pub prime_time: DateTime<Utc>,
    pub max_time: DateTime<Utc>,
}

impl DateBounds {
    pub fn new(
        min_time: DateTime<Utc>,
        current_time: DateTime<Utc>,
        prime_time: DateTime<Utc>,
        max_time: DateTime<Utc>,
    ) -> Result<Self, BoundsError> {
        if min_time >= max_time {
            return Err(BoundsError::Inverted {
                min: min_time,
                max: max_time,
            });
        }
        Ok(Self {
            min_time,
            current_time,
            prime_time,
            max_time,
        })
    }

    pub fn span(&self) -> DateRange {
        DateRange {
            start: self.min_time,
            end: self.max_time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JumpAnchor {
    Now,
    PrimeTime,
}

impl JumpAnchor {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Now => "now",
            Self::PrimeTime => "prime time",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JumpMark {
    pub anchor: JumpAnchor,
    pub target: DateTime<Utc>,
}

impl JumpMark {
    fn now(bounds: &DateBounds) -> Self {
        Self {
            anchor: JumpAnchor::Now,
            target: bounds.current_time,
        }
    }

    fn prime_time(bounds: &DateBounds) -> Self {
        Self {
            anchor: JumpAnchor::PrimeTime,
            target: bounds.prime_time,
        }
    }

    pub fn label(&self) -> &'static str {
        self.anchor.label()
    }
}

/// `None` means the mark is hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JumpMarks {
    pub left: Option<JumpMark>,
    pub right: Option<JumpMark>,
    pub current_time_visible: bool,
}

pub fn left_mark(left_edge: DateTime<Utc>, bounds: &DateBounds) -> Option<JumpMark> {
    if left_edge >= bounds.max_time {
        None
    } else if left_edge >= bounds.prime_time {
        Some(JumpMark::prime_time(bounds))
    } else if left_edge >= bounds.current_time {
        Some(JumpMark::now(bounds))
    } else {
        None
    }
}

pub fn right_mark(right_edge: DateTime<Utc>, bounds: &DateBounds) -> Option<JumpMark> {
    if right_edge < bounds.min_time {
        None
    } else if right_edge < bounds.current_time {
        Some(JumpMark::now(bounds))
    } else if right_edge < bounds.prime_time {
        Some(JumpMark::prime_time(bounds))
    } else {
        None
    }
}

pub fn compute_marks(visible: &DateRange, bounds: &DateBounds) -> JumpMarks {
    JumpMarks {
        left: left_mark(visible.start, bounds),
        right: right_mark(visible.end, bounds),
        current_time_visible: visible.contains(bounds.current_time),
    }
}

/// Recomputes marks and remembers the last result so unchanged marks can be
/// skipped by the UI.
#[derive(Debug, Clone)]
pub struct JumpMarkEngine {
    bounds: DateBounds,
    last: Option<JumpMarks>,
}

impl JumpMarkEngine {
    pub fn new(bounds: DateBounds) -> Self {
        Self { bounds, last: None }
    }

    pub fn bounds(&self) -> &DateBounds {
        &self.bounds
    }

    pub fn last(&self) -> Option<&JumpMarks> {
        self.last.as_ref()
    }

    /// Returns the new marks only when they differ from the previous call.
    pub fn update(&mut self, visible: &DateRange) -> Option<JumpMarks> {
        let marks = compute_marks(visible, &self.bounds);
        if self.last.as_ref() == Some(&marks) {
            return None;
        }
        self.last = Some(marks);
        Some(marks)
    }
}
