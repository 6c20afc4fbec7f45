//! Grid guide configuration types.
//!
//! The binary reads `gridguide.toml` into [`GuideConfig`]; the sync engine
//! receives the relevant sections by value at construction and never reads
//! the file again.

use serde::{Deserialize, Serialize};

/// Canonical config file name.
pub const CONFIG_FILE_NAME: &str = "gridguide.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GuideConfig {
    #[serde(default)]
    pub layout: LayoutSettings,
    #[serde(default)]
    pub window: WindowSettings,
    #[serde(default)]
    pub bounds: BoundsSettings,
    #[serde(default)]
    pub sync: SyncSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutSettings {
    /// Height of one channel row, in points.
    #[serde(default = "default_row_height")]
    pub row_height: f64,
    /// Width of one hour at zoom 1.0, in points.
    #[serde(default = "default_hour_width")]
    pub hour_width: f64,
    #[serde(default = "default_min_zoom")]
    pub min_zoom: f64,
    #[serde(default = "default_max_zoom")]
    pub max_zoom: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            row_height: default_row_height(),
            hour_width: default_hour_width(),
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
        }
    }
}

impl LayoutSettings {
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        if zoom.is_finite() {
            zoom.clamp(self.min_zoom, self.max_zoom)
        } else {
            self.min_zoom
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowSettings {
    #[serde(default = "default_lookbehind_minutes")]
    pub lookbehind_minutes: u32,
    #[serde(default = "default_lookahead_minutes")]
    pub lookahead_minutes: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            lookbehind_minutes: default_lookbehind_minutes(),
            lookahead_minutes: default_lookahead_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoundsSettings {
    /// Whole days before today that stay addressable.
    #[serde(default = "default_days_back")]
    pub days_back: u32,
    /// Whole days after today that stay addressable.
    #[serde(default = "default_days_ahead")]
    pub days_ahead: u32,
    /// Local wall-clock time of the prime time anchor, `HH:MM`.
    #[serde(default = "default_prime_time")]
    pub prime_time: String,
    /// Offset of the guide's local time from UTC.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

impl Default for BoundsSettings {
    fn default() -> Self {
        Self {
            days_back: default_days_back(),
            days_ahead: default_days_ahead(),
            prime_time: default_prime_time(),
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncSettings {
    /// Quiet period before a window change launches a round.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_max_rounds_in_flight")]
    pub max_rounds_in_flight: usize,
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_retry_delays_ms")]
    pub retry_delays_ms: Vec<u64>,
    #[serde(default = "default_channel_list_key")]
    pub channel_list_key: String,
    #[serde(default = "default_profile_id")]
    pub profile_id: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_rounds_in_flight: default_max_rounds_in_flight(),
            worker_threads: default_worker_threads(),
            max_retries: 0,
            retry_delays_ms: default_retry_delays_ms(),
            channel_list_key: default_channel_list_key(),
            profile_id: default_profile_id(),
        }
    }
}

impl SyncSettings {
    /// Key under which the selected channel list id is persisted.
    pub fn preference_key(&self) -> String {
        format!("{}-{}", self.channel_list_key, self.profile_id)
    }
}

// ── Serde default functions ─────────────────────────────────────────────

fn default_row_height() -> f64 {
    60.0
}
fn default_hour_width() -> f64 {
    400.0
}
fn default_min_zoom() -> f64 {
    1.0
}
fn default_max_zoom() -> f64 {
    2.0
}
fn default_lookbehind_minutes() -> u32 {
    240
}
fn default_lookahead_minutes() -> u32 {
    720
}
fn default_days_back() -> u32 {
    1
}
fn default_days_ahead() -> u32 {
    14
}
fn default_prime_time() -> String {
    "20:15".to_string()
}
fn default_utc_offset_minutes() -> i32 {
    60
}
fn default_settle_ms() -> u64 {
    50
}
fn default_fetch_timeout_secs() -> u64 {
    15
}
fn default_max_rounds_in_flight() -> usize {
    2
}
fn default_worker_threads() -> usize {
    4
}
fn default_retry_delays_ms() -> Vec<u64> {
    vec![250, 500, 1_000]
}
fn default_channel_list_key() -> String {
    "ChannelList".to_string()
}
fn default_profile_id() -> String {
    "default".to_string()
}

fn is_valid_prime_time(raw: &str) -> bool {
    let Some((hours, minutes)) = raw.trim().split_once(':') else {
        return false;
    };
    matches!(
        (hours.parse::<u32>(), minutes.parse::<u32>()),
        (Ok(h), Ok(m)) if h < 24 && m < 60
    )
}

/// Replace out-of-range values with their defaults after loading raw TOML.
/// Returns true when any field was updated.
pub fn apply_compat_fallbacks(config: &mut GuideConfig) -> bool {
    let mut changed = false;

    let layout = &mut config.layout;
    if !layout.row_height.is_finite() || layout.row_height <= 0.0 {
        layout.row_height = default_row_height();
        changed = true;
    }
    if !layout.hour_width.is_finite() || layout.hour_width <= 0.0 {
        layout.hour_width = default_hour_width();
        changed = true;
    }
    let zoom_valid = layout.min_zoom.is_finite()
        && layout.max_zoom.is_finite()
        && layout.min_zoom > 0.0
        && layout.min_zoom <= layout.max_zoom;
    if !zoom_valid {
        layout.min_zoom = default_min_zoom();
        layout.max_zoom = default_max_zoom();
        changed = true;
    }

    if config.window.lookbehind_minutes == 0 {
        config.window.lookbehind_minutes = default_lookbehind_minutes();
        changed = true;
    }
    if config.window.lookahead_minutes == 0 {
        config.window.lookahead_minutes = default_lookahead_minutes();
        changed = true;
    }

    if config.bounds.days_back == 0 && config.bounds.days_ahead == 0 {
        config.bounds.days_ahead = default_days_ahead();
        changed = true;
    }
    if !is_valid_prime_time(&config.bounds.prime_time) {
        config.bounds.prime_time = default_prime_time();
        changed = true;
    }
    if config.bounds.utc_offset_minutes.abs() >= 24 * 60 {
        config.bounds.utc_offset_minutes = default_utc_offset_minutes();
        changed = true;
    }

    if config.sync.max_rounds_in_flight == 0 {
        config.sync.max_rounds_in_flight = default_max_rounds_in_flight();
        changed = true;
    }
    if config.sync.worker_threads == 0 {
        config.sync.worker_threads = default_worker_threads();
        changed = true;
    }
    if config.sync.fetch_timeout_secs == 0 {
        config.sync.fetch_timeout_secs = default_fetch_timeout_secs();
        changed = true;
    }

    changed
}
