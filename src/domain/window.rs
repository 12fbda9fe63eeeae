// Time-window domain model and fetch plan resolution
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use serde::Deserialize;

pub const MILLIS_PER_HOUR: i64 = 60 * 60 * 1000;
pub const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;
/// Longest rolling window a client may ask for.
pub const MAX_ROLLING_MS: i64 = 100 * 365 * MILLIS_PER_DAY;

/// Fixed look-back presets offered by the window dropdown.
///
/// `Year` is 365 days flat; leap years are not accounted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RollingPreset {
    #[serde(rename = "day")]
    Day,
    #[serde(rename = "7days")]
    Week,
    #[serde(rename = "30days")]
    Month,
    #[serde(rename = "year")]
    Year,
}

impl RollingPreset {
    pub fn duration_ms(&self) -> i64 {
        match self {
            RollingPreset::Day => MILLIS_PER_DAY,
            RollingPreset::Week => 7 * MILLIS_PER_DAY,
            RollingPreset::Month => 30 * MILLIS_PER_DAY,
            RollingPreset::Year => 365 * MILLIS_PER_DAY,
        }
    }
}

/// The window a surface is showing. Exactly one is active per surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMode {
    Live,
    Rolling { duration_ms: i64 },
    /// `end = None` means "from `start` until now", fetched once.
    Range {
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    },
}

impl WindowMode {
    pub fn rolling(preset: RollingPreset) -> Self {
        WindowMode::Rolling {
            duration_ms: preset.duration_ms(),
        }
    }
}

/// Where a live surface starts reading from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveLookback {
    /// Buffered views accumulate everything since local midnight.
    StartOfDay,
    /// Latest-value and last-N views only care about the present.
    Now,
}

/// Concrete fetch parameters for one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPlan {
    Live {
        poll_interval: std::time::Duration,
        lookback: DateTime<Utc>,
    },
    OneShot {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        /// The user only picked a start date.
        open_ended: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindowPolicy {
    pub poll_interval: std::time::Duration,
    pub lookback: LiveLookback,
}

impl TimeWindowPolicy {
    pub fn new(poll_interval: std::time::Duration, lookback: LiveLookback) -> Self {
        Self {
            poll_interval,
            lookback,
        }
    }

    pub fn resolve(&self, mode: &WindowMode, now: DateTime<Utc>) -> FetchPlan {
        self.resolve_in(mode, now, &Local)
    }

    /// Same as [`resolve`](Self::resolve) with an explicit zone for "start of day".
    pub fn resolve_in<Tz: TimeZone>(
        &self,
        mode: &WindowMode,
        now: DateTime<Utc>,
        zone: &Tz,
    ) -> FetchPlan {
        match *mode {
            WindowMode::Live => FetchPlan::Live {
                poll_interval: self.poll_interval,
                lookback: match self.lookback {
                    LiveLookback::StartOfDay => start_of_day(now, zone),
                    LiveLookback::Now => now,
                },
            },
            WindowMode::Rolling { duration_ms } => FetchPlan::OneShot {
                start: rolling_start(now, duration_ms),
                end: now,
                open_ended: false,
            },
            WindowMode::Range { start, end } => FetchPlan::OneShot {
                start,
                end: end.unwrap_or(now),
                open_ended: end.is_none(),
            },
        }
    }
}

/// `now` minus the window, clamped to the earliest representable instant.
fn rolling_start(now: DateTime<Utc>, duration_ms: i64) -> DateTime<Utc> {
    Duration::try_milliseconds(duration_ms)
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Midnight of `now`'s calendar day in `zone`, as a UTC instant.
pub fn start_of_day<Tz: TimeZone>(now: DateTime<Utc>, zone: &Tz) -> DateTime<Utc> {
    let local_date = now.with_timezone(zone).date_naive();
    local_date
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| zone.from_local_datetime(&midnight).earliest())
        .map(|midnight| midnight.with_timezone(&Utc))
        // midnight skipped by a DST jump
        .unwrap_or(now)
}
