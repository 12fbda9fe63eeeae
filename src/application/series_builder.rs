// Series builder - shapes fetched payloads into render-ready series
use crate::domain::electric::{GroupedSeries, Payload, Phase, Quantity, RawPoint};
use crate::domain::selection::SelectionDescriptor;
use crate::domain::surface::SeriesShape;
use crate::domain::telemetry::{RenderSeries, SeriesPoint};

const GAUGE_SIGNIFICANT_DIGITS: i32 = 4;
const TEMPERATURE_LABEL: &str = "Temperature";
const TEMPERATURE_UNIT: &str = "°C";

#[derive(Debug, Clone, Copy)]
pub struct SeriesBuilder {
    shape: SeriesShape,
}

impl SeriesBuilder {
    pub fn new(shape: SeriesShape) -> Self {
        Self { shape }
    }

    /// Build the full render projection for `payload`.
    ///
    /// Only the first selected quantity is projected. Phases come out in L1, L2,
    /// L3 order and grouped data as Min, Mean, Max, so legend colours stay put
    /// across refreshes.
    pub fn build(&self, payload: &Payload, selection: &SelectionDescriptor) -> Vec<RenderSeries> {
        match self.shape {
            SeriesShape::Timeline => timeline(payload, selection),
            SeriesShape::Slices => slices(payload, selection),
            SeriesShape::Gauge => gauge(payload, selection).into_iter().collect(),
        }
    }

    /// Unit label for the dial/axis formatter.
    pub fn unit(payload_is_temperature: bool, selection: &SelectionDescriptor) -> &'static str {
        if payload_is_temperature {
            return TEMPERATURE_UNIT;
        }
        selection
            .primary_quantity()
            .map(|q| q.unit())
            .unwrap_or_default()
    }
}

fn timeline(payload: &Payload, selection: &SelectionDescriptor) -> Vec<RenderSeries> {
    match payload {
        Payload::Electric(data) => {
            let Some(quantity) = selection.primary_quantity() else {
                return Vec::new();
            };
            let points = data.points_for(quantity);
            phase_targets(quantity, selection)
                .into_iter()
                .map(|phase| {
                    RenderSeries::new(live_name(quantity, phase), project(points, phase))
                })
                .collect()
        }
        Payload::GroupedElectric(data) => {
            let Some(quantity) = selection.primary_quantity() else {
                return Vec::new();
            };
            let grouped = data.series_for(quantity);
            phase_targets(quantity, selection)
                .into_iter()
                .flat_map(|phase| {
                    let subject = grouped_subject(quantity, phase);
                    grouped_triple(grouped, &subject, phase)
                })
                .collect()
        }
        Payload::Temperature(points) => {
            vec![RenderSeries::new(TEMPERATURE_LABEL, project(points, None))]
        }
        Payload::GroupedTemperature(grouped) => grouped_triple(grouped, "temperature", None),
    }
}

fn slices(payload: &Payload, selection: &SelectionDescriptor) -> Vec<RenderSeries> {
    match payload {
        Payload::Electric(_) | Payload::GroupedElectric(_) => {
            let Some(quantity) = selection.primary_quantity() else {
                return Vec::new();
            };
            let points: &[RawPoint] = match payload {
                Payload::Electric(data) => data.points_for(quantity),
                Payload::GroupedElectric(data) => &data.series_for(quantity).mean,
                _ => &[],
            };
            phase_targets(quantity, selection)
                .into_iter()
                .filter_map(|phase| {
                    let filtered: Vec<&RawPoint> =
                        points.iter().filter(|p| p.phase == phase).collect();
                    summarize(&filtered)
                        .map(|point| RenderSeries::new(live_name(quantity, phase), vec![point]))
                })
                .collect()
        }
        Payload::Temperature(points) => {
            let all: Vec<&RawPoint> = points.iter().collect();
            summarize(&all)
                .map(|point| vec![RenderSeries::new(TEMPERATURE_LABEL, vec![point])])
                .unwrap_or_default()
        }
        Payload::GroupedTemperature(grouped) => {
            let all: Vec<&RawPoint> = grouped.mean.iter().collect();
            summarize(&all)
                .map(|point| vec![RenderSeries::new(TEMPERATURE_LABEL, vec![point])])
                .unwrap_or_default()
        }
    }
}

fn gauge(payload: &Payload, selection: &SelectionDescriptor) -> Option<RenderSeries> {
    let (label, candidates): (&str, Vec<&RawPoint>) = match payload {
        Payload::Electric(data) => {
            let quantity = selection.primary_quantity()?;
            let phases = phase_targets(quantity, selection);
            let points = data
                .points_for(quantity)
                .iter()
                .filter(|p| phases.contains(&p.phase))
                .collect();
            (quantity.label(), points)
        }
        Payload::GroupedElectric(data) => {
            let quantity = selection.primary_quantity()?;
            let phases = phase_targets(quantity, selection);
            let points = data
                .series_for(quantity)
                .mean
                .iter()
                .filter(|p| phases.contains(&p.phase))
                .collect();
            (quantity.label(), points)
        }
        Payload::Temperature(points) => (TEMPERATURE_LABEL, points.iter().collect()),
        Payload::GroupedTemperature(grouped) => (TEMPERATURE_LABEL, grouped.mean.iter().collect()),
    };

    let newest = candidates.into_iter().max_by_key(|p| p.time)?;
    let value = round_significant(newest.value, GAUGE_SIGNIFICANT_DIGITS);
    Some(RenderSeries::new(
        label,
        vec![SeriesPoint::new(newest.time_ms(), value)],
    ))
}

/// Phases to emit for `quantity`; `None` stands for the single phase-less series.
fn phase_targets(quantity: Quantity, selection: &SelectionDescriptor) -> Vec<Option<Phase>> {
    if quantity.has_phases() {
        selection
            .effective_phases(quantity)
            .into_iter()
            .map(Some)
            .collect()
    } else {
        vec![None]
    }
}

fn live_name(quantity: Quantity, phase: Option<Phase>) -> String {
    match phase {
        Some(phase) => format!("{} {}", phase, quantity.label()),
        None => quantity.label().to_string(),
    }
}

fn grouped_subject(quantity: Quantity, phase: Option<Phase>) -> String {
    match (quantity, phase) {
        (Quantity::Current, Some(phase)) => format!("{} current", phase),
        (Quantity::Voltage, Some(phase)) => format!("{} voltage", phase),
        (Quantity::Current, None) => "current".to_string(),
        (Quantity::Voltage, None) => "voltage".to_string(),
        (Quantity::GridFrequency, _) => "grid frequencies".to_string(),
    }
}

fn grouped_triple(grouped: &GroupedSeries, subject: &str, phase: Option<Phase>) -> Vec<RenderSeries> {
    vec![
        RenderSeries::new(format!("Min {}", subject), project(&grouped.min, phase)),
        RenderSeries::new(format!("Mean {}", subject), project(&grouped.mean, phase)),
        RenderSeries::new(format!("Max {}", subject), project(&grouped.max, phase)),
    ]
}

/// Keep the points of one phase (or all points for phase-less channels) as
/// `(timestamp, value)` pairs.
fn project(points: &[RawPoint], phase: Option<Phase>) -> Vec<SeriesPoint> {
    points
        .iter()
        .filter(|p| phase.is_none() || p.phase == phase)
        .map(|p| SeriesPoint::new(p.time_ms(), p.value))
        .collect()
}

/// Mean value stamped with the newest timestamp.
fn summarize(points: &[&RawPoint]) -> Option<SeriesPoint> {
    let newest = points.iter().max_by_key(|p| p.time)?;
    let mean = points.iter().map(|p| p.value).sum::<f64>() / points.len() as f64;
    Some(SeriesPoint::new(newest.time_ms(), mean))
}

fn round_significant(value: f64, digits: i32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    let magnitude = value.abs().log10().floor() as i32;
    let factor = 10f64.powi(digits - 1 - magnitude);
    if !factor.is_finite() {
        // subnormal magnitudes overflow the scale factor
        return value;
    }
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::electric::{ElectricData, GroupedElectricData};
    use chrono::{TimeZone, Utc};

    fn point(value: f64, secs: i64, phase: Option<Phase>) -> RawPoint {
        RawPoint::new(value, Utc.timestamp_opt(secs, 0).unwrap(), phase)
    }

    fn names(series: &[RenderSeries]) -> Vec<&str> {
        series.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_grouped_grid_frequency_triple() {
        let triple = |base: f64| {
            vec![
                point(base, 10, None),
                point(base + 0.01, 20, None),
                point(base + 0.02, 30, None),
            ]
        };
        let payload = Payload::GroupedElectric(GroupedElectricData {
            grid_frequencies: GroupedSeries {
                min: triple(49.90),
                mean: triple(50.00),
                max: triple(50.10),
            },
            ..Default::default()
        });
        let selection = SelectionDescriptor::from_nodes(["Grid frequency"]);

        let series = SeriesBuilder::new(SeriesShape::Timeline).build(&payload, &selection);

        assert_eq!(
            names(&series),
            vec![
                "Min grid frequencies",
                "Mean grid frequencies",
                "Max grid frequencies"
            ]
        );
        assert!(series.iter().all(|s| s.points.len() == 3));
        assert_eq!(series[2].points[0], SeriesPoint::new(10_000, 50.10));
    }

    #[test]
    fn test_live_series_per_phase_in_stable_order() {
        let payload = Payload::Electric(ElectricData {
            currents: vec![
                point(3.0, 10, Some(Phase::L3)),
                point(1.0, 10, Some(Phase::L1)),
                point(1.5, 20, Some(Phase::L1)),
                point(2.0, 10, Some(Phase::L2)),
            ],
            voltages: vec![point(231.0, 10, Some(Phase::L1))],
            ..Default::default()
        });
        let selection = SelectionDescriptor::from_nodes(["CurrentL3", "CurrentL1", "VoltageL1"]);

        let series = SeriesBuilder::new(SeriesShape::Timeline).build(&payload, &selection);

        assert_eq!(names(&series), vec!["L1 Current", "L3 Current"]);
        assert_eq!(series[0].points.len(), 2);
        assert_eq!(series[1].points, vec![SeriesPoint::new(10_000, 3.0)]);
    }

    #[test]
    fn test_live_grid_frequency_is_single_series() {
        let payload = Payload::Electric(ElectricData {
            grid_frequencies: vec![point(50.01, 10, None), point(49.99, 20, None)],
            ..Default::default()
        });
        let selection = SelectionDescriptor::from_nodes(["Grid frequency"]);

        let series = SeriesBuilder::new(SeriesShape::Timeline).build(&payload, &selection);

        assert_eq!(names(&series), vec!["Grid Frequency"]);
        assert_eq!(series[0].points.len(), 2);
    }

    #[test]
    fn test_grouped_voltage_uses_voltage_phases() {
        let payload = Payload::GroupedElectric(GroupedElectricData {
            voltages: GroupedSeries {
                min: vec![point(228.0, 10, Some(Phase::L2))],
                mean: vec![point(230.0, 10, Some(Phase::L2))],
                max: vec![point(232.0, 10, Some(Phase::L2))],
            },
            ..Default::default()
        });
        let selection = SelectionDescriptor::from_nodes(["VoltageL2"]);

        let series = SeriesBuilder::new(SeriesShape::Timeline).build(&payload, &selection);

        assert_eq!(
            names(&series),
            vec!["Min L2 voltage", "Mean L2 voltage", "Max L2 voltage"]
        );
        assert_eq!(series[1].points, vec![SeriesPoint::new(10_000, 230.0)]);
    }

    #[test]
    fn test_empty_payload_keeps_series_names_with_no_points() {
        let payload = Payload::Electric(ElectricData::default());
        let selection = SelectionDescriptor::default();

        let series = SeriesBuilder::new(SeriesShape::Timeline).build(&payload, &selection);

        assert_eq!(names(&series), vec!["L1 Current"]);
        assert!(series[0].points.is_empty());
    }

    #[test]
    fn test_gauge_takes_newest_point_rounded() {
        let payload = Payload::Electric(ElectricData {
            voltages: vec![
                point(229.1234, 10, Some(Phase::L1)),
                point(230.4567, 30, Some(Phase::L1)),
                point(231.0, 20, Some(Phase::L2)),
            ],
            ..Default::default()
        });
        let selection = SelectionDescriptor::from_nodes(["Voltage"]);

        let series = SeriesBuilder::new(SeriesShape::Gauge).build(&payload, &selection);

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].name, "Voltage");
        assert_eq!(series[0].points, vec![SeriesPoint::new(30_000, 230.5)]);
    }

    #[test]
    fn test_gauge_without_points_is_empty() {
        let payload = Payload::Electric(ElectricData::default());
        let series =
            SeriesBuilder::new(SeriesShape::Gauge).build(&payload, &SelectionDescriptor::default());
        assert!(series.is_empty());
    }

    #[test]
    fn test_slices_average_each_phase() {
        let payload = Payload::Electric(ElectricData {
            currents: vec![
                point(2.0, 10, Some(Phase::L1)),
                point(4.0, 20, Some(Phase::L1)),
                point(5.0, 15, Some(Phase::L3)),
            ],
            ..Default::default()
        });
        let selection = SelectionDescriptor::from_nodes(["Current"]);

        let series = SeriesBuilder::new(SeriesShape::Slices).build(&payload, &selection);

        assert_eq!(names(&series), vec!["L1 Current", "L3 Current"]);
        assert_eq!(series[0].points, vec![SeriesPoint::new(20_000, 3.0)]);
        assert_eq!(series[1].points, vec![SeriesPoint::new(15_000, 5.0)]);
    }

    #[test]
    fn test_temperature_series() {
        let payload = Payload::Temperature(vec![point(21.5, 10, None), point(21.7, 20, None)]);
        let series = SeriesBuilder::new(SeriesShape::Timeline)
            .build(&payload, &SelectionDescriptor::default());
        assert_eq!(names(&series), vec!["Temperature"]);
        assert_eq!(series[0].points.len(), 2);

        let grouped = Payload::GroupedTemperature(GroupedSeries::default());
        let series = SeriesBuilder::new(SeriesShape::Timeline)
            .build(&grouped, &SelectionDescriptor::default());
        assert_eq!(
            names(&series),
            vec!["Min temperature", "Mean temperature", "Max temperature"]
        );
    }

    #[test]
    fn test_round_significant() {
        assert_eq!(round_significant(49.98765, 4), 49.99);
        assert_eq!(round_significant(-12.3456, 4), -12.35);
        assert_eq!(round_significant(0.0, 4), 0.0);
    }

    #[test]
    fn test_round_significant_keeps_subnormal_values() {
        let tiny = 1.0e-310;

        assert_eq!(round_significant(tiny, 4), tiny);
        assert_eq!(round_significant(-tiny, 4), -tiny);
    }

    #[test]
    fn test_units() {
        let selection = SelectionDescriptor::from_nodes(["Grid frequency"]);
        assert_eq!(SeriesBuilder::unit(false, &selection), "Hz");
        assert_eq!(SeriesBuilder::unit(true, &selection), "°C");
    }
}
