use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, TimeZone, Utc};
use gridguide_core::{BoundsError, DateBounds, WindowCalculator};
use gridguide_runtime_config::{BoundsSettings, WindowSettings};

const MINUTES_PER_DAY: i32 = 24 * 60;

fn parse_prime_time(raw: &str) -> Result<NaiveTime, BoundsError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| BoundsError::InvalidPrimeTime(raw.to_string()))
}

/// Build the process-wide date bounds once, at start-up.
///
/// Day boundaries and the prime time anchor are evaluated in the guide's local
/// time (`utc_offset_minutes`), then stored as UTC.
pub fn bounds_from_settings(
    now: DateTime<Utc>,
    settings: &BoundsSettings,
) -> Result<DateBounds, BoundsError> {
    if settings.utc_offset_minutes.abs() >= MINUTES_PER_DAY {
        return Err(BoundsError::InvalidUtcOffset(settings.utc_offset_minutes));
    }
    let offset = Duration::minutes(i64::from(settings.utc_offset_minutes));
    let to_utc = |local: NaiveDateTime| Utc.from_utc_datetime(&(local - offset));

    let today = (now + offset).date_naive();
    let midnight = today.and_time(NaiveTime::MIN);
    let prime = today.and_time(parse_prime_time(&settings.prime_time)?);

    DateBounds::new(
        to_utc(midnight - Duration::days(i64::from(settings.days_back))),
        now,
        to_utc(prime),
        to_utc(midnight + Duration::days(i64::from(settings.days_ahead))),
    )
}

pub fn window_calculator(
    bounds: DateBounds,
    settings: &WindowSettings,
) -> Result<WindowCalculator, BoundsError> {
    WindowCalculator::new(
        bounds,
        Duration::minutes(i64::from(settings.lookbehind_minutes)),
        Duration::minutes(i64::from(settings.lookahead_minutes)),
    )
}
