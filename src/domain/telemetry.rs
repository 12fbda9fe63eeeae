// Render-ready series models
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub time_ms: i64,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(time_ms: i64, value: f64) -> Self {
        Self { time_ms, value }
    }
}

/// A named series handed to the renderer. Built fresh on every data arrival
/// and replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSeries {
    pub name: String,
    pub points: Vec<SeriesPoint>,
}

impl RenderSeries {
    pub fn new(name: impl Into<String>, points: Vec<SeriesPoint>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }
}

/// Total number of points across a render projection.
pub fn point_count(series: &[RenderSeries]) -> usize {
    series.iter().map(|s| s.points.len()).sum()
}
