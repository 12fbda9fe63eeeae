// Visual surface model - how each kind of panel fetches and shapes its data
use super::window::LiveLookback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    Gauge,
    Pie,
    Line,
    Temperature,
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SurfaceKind::Gauge => "gauge",
            SurfaceKind::Pie => "pie",
            SurfaceKind::Line => "line",
            SurfaceKind::Temperature => "temperature",
        };
        f.write_str(name)
    }
}

/// What the surface measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Electric,
    Temperature,
}

/// Which collaborator call feeds live mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveSource {
    Last,
    LastN,
    /// Everything since a cursor, appended to a buffer.
    Since,
}

/// Which collaborator call feeds historical windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistorySource {
    Raw,
    Grouped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesShape {
    /// One single-point series with the newest reading.
    Gauge,
    /// One single-point series per phase.
    Slices,
    /// Full time series, min/mean/max triples for grouped data.
    Timeline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceConfig {
    pub kind: SurfaceKind,
    pub subject: Subject,
    pub poll_interval: Duration,
    pub live_source: LiveSource,
    pub last_n: usize,
    pub history_source: HistorySource,
    pub shape: SeriesShape,
}

impl SurfaceConfig {
    pub fn for_kind(kind: SurfaceKind) -> Self {
        match kind {
            SurfaceKind::Gauge => Self {
                kind,
                subject: Subject::Electric,
                poll_interval: Duration::from_millis(5000),
                live_source: LiveSource::Last,
                last_n: 1,
                history_source: HistorySource::Raw,
                shape: SeriesShape::Gauge,
            },
            SurfaceKind::Pie => Self {
                kind,
                subject: Subject::Electric,
                poll_interval: Duration::from_millis(5000),
                live_source: LiveSource::Last,
                last_n: 1,
                history_source: HistorySource::Raw,
                shape: SeriesShape::Slices,
            },
            SurfaceKind::Line => Self {
                kind,
                subject: Subject::Electric,
                poll_interval: Duration::from_millis(10000),
                live_source: LiveSource::LastN,
                last_n: 60,
                history_source: HistorySource::Grouped,
                shape: SeriesShape::Timeline,
            },
            SurfaceKind::Temperature => Self {
                kind,
                subject: Subject::Temperature,
                poll_interval: Duration::from_millis(10000),
                live_source: LiveSource::Since,
                last_n: 1,
                history_source: HistorySource::Raw,
                shape: SeriesShape::Timeline,
            },
        }
    }

    pub fn accumulates(&self) -> bool {
        self.live_source == LiveSource::Since
    }

    pub fn lookback(&self) -> LiveLookback {
        if self.accumulates() {
            LiveLookback::StartOfDay
        } else {
            LiveLookback::Now
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interactive_surfaces_poll_faster() {
        assert_eq!(
            SurfaceConfig::for_kind(SurfaceKind::Gauge).poll_interval,
            Duration::from_millis(5000)
        );
        assert_eq!(
            SurfaceConfig::for_kind(SurfaceKind::Pie).poll_interval,
            Duration::from_millis(5000)
        );
        assert_eq!(
            SurfaceConfig::for_kind(SurfaceKind::Temperature).poll_interval,
            Duration::from_millis(10000)
        );
    }

    #[test]
    fn test_only_since_surfaces_buffer_from_start_of_day() {
        let temperature = SurfaceConfig::for_kind(SurfaceKind::Temperature);
        assert!(temperature.accumulates());
        assert_eq!(temperature.lookback(), LiveLookback::StartOfDay);

        let line = SurfaceConfig::for_kind(SurfaceKind::Line);
        assert!(!line.accumulates());
        assert_eq!(line.lookback(), LiveLookback::Now);
    }
}
