// Output port for a visual surface
use crate::domain::axis::AxisBounds;
use crate::domain::telemetry::RenderSeries;
use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warn,
    Error,
}

/// Everything a surface tells its renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceEvent {
    Series {
        series: Vec<RenderSeries>,
        bounds: AxisBounds,
        unit: String,
    },
    Loading {
        loading: bool,
    },
    Notify {
        severity: Severity,
        summary: String,
        detail: String,
    },
}

pub trait SurfaceSink: Send + Sync {
    /// Replaces whatever the renderer currently shows.
    fn on_series_updated(&self, series: Vec<RenderSeries>, bounds: AxisBounds, unit: &str);

    fn on_loading_state_changed(&self, loading: bool);

    fn on_notify(&self, severity: Severity, summary: &str, detail: &str);
}

/// Events kept for a subscriber that is not reading. Older ones are
/// overwritten first; every series event replaces the previous one anyway.
pub const EVENT_BUFFER: usize = 64;

/// Forwards surface output as [`SurfaceEvent`]s over a bounded channel.
pub struct ChannelSink {
    tx: broadcast::Sender<SurfaceEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, broadcast::Receiver<SurfaceEvent>) {
        let (tx, rx) = broadcast::channel(EVENT_BUFFER);
        (Self { tx }, rx)
    }

    fn emit(&self, event: SurfaceEvent) {
        // Nobody listening is fine: the session keeps running until closed.
        if self.tx.send(event).is_err() {
            tracing::trace!("surface event dropped, no subscriber");
        }
    }
}

impl SurfaceSink for ChannelSink {
    fn on_series_updated(&self, series: Vec<RenderSeries>, bounds: AxisBounds, unit: &str) {
        self.emit(SurfaceEvent::Series {
            series,
            bounds,
            unit: unit.to_string(),
        });
    }

    fn on_loading_state_changed(&self, loading: bool) {
        self.emit(SurfaceEvent::Loading { loading });
    }

    fn on_notify(&self, severity: Severity, summary: &str, detail: &str) {
        self.emit(SurfaceEvent::Notify {
            severity,
            summary: summary.to_string(),
            detail: detail.to_string(),
        });
    }
}
