// Electric and ambient telemetry domain models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A measured electrical dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Quantity {
    Current,
    Voltage,
    GridFrequency,
}

impl Quantity {
    /// Wire name used in `electricQuantities` filters.
    pub fn as_param(&self) -> &'static str {
        match self {
            Quantity::Current => "CURRENT",
            Quantity::Voltage => "VOLTAGE",
            Quantity::GridFrequency => "GRID_FREQUENCY",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Quantity::Current => "Current",
            Quantity::Voltage => "Voltage",
            Quantity::GridFrequency => "Grid Frequency",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Quantity::Current => "A",
            Quantity::Voltage => "V",
            Quantity::GridFrequency => "Hz",
        }
    }

    /// Grid frequency is measured once for the whole installation.
    pub fn has_phases(&self) -> bool {
        !matches!(self, Quantity::GridFrequency)
    }
}

/// One leg of a three-phase system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    L1,
    L2,
    L3,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::L1, Phase::L2, Phase::L3];

    pub fn parse(value: &str) -> Option<Phase> {
        match value {
            "L1" => Some(Phase::L1),
            "L2" => Some(Phase::L2),
            "L3" => Some(Phase::L3),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::L1 => f.write_str("L1"),
            Phase::L2 => f.write_str("L2"),
            Phase::L3 => f.write_str("L3"),
        }
    }
}

/// A single sample. `phase` is `None` for grid frequency and temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPoint {
    pub value: f64,
    pub time: DateTime<Utc>,
    pub phase: Option<Phase>,
}

impl RawPoint {
    pub fn new(value: f64, time: DateTime<Utc>, phase: Option<Phase>) -> Self {
        Self { value, time, phase }
    }

    pub fn time_ms(&self) -> i64 {
        self.time.timestamp_millis()
    }
}

/// Min/mean/max reduction of a channel, each list time-ordered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedSeries {
    pub min: Vec<RawPoint>,
    pub mean: Vec<RawPoint>,
    pub max: Vec<RawPoint>,
}

impl GroupedSeries {
    fn append(&mut self, other: GroupedSeries) {
        self.min.extend(other.min);
        self.mean.extend(other.mean);
        self.max.extend(other.max);
    }
}

/// Raw electric samples as returned by the data source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElectricData {
    pub currents: Vec<RawPoint>,
    pub voltages: Vec<RawPoint>,
    pub grid_frequencies: Vec<RawPoint>,
}

impl ElectricData {
    pub fn points_for(&self, quantity: Quantity) -> &[RawPoint] {
        match quantity {
            Quantity::Current => &self.currents,
            Quantity::Voltage => &self.voltages,
            Quantity::GridFrequency => &self.grid_frequencies,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedElectricData {
    pub currents: GroupedSeries,
    pub voltages: GroupedSeries,
    pub grid_frequencies: GroupedSeries,
}

impl GroupedElectricData {
    pub fn series_for(&self, quantity: Quantity) -> &GroupedSeries {
        match quantity {
            Quantity::Current => &self.currents,
            Quantity::Voltage => &self.voltages,
            Quantity::GridFrequency => &self.grid_frequencies,
        }
    }
}

/// Anything a fetch can hand back to a surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Electric(ElectricData),
    GroupedElectric(GroupedElectricData),
    Temperature(Vec<RawPoint>),
    GroupedTemperature(GroupedSeries),
}

impl Payload {
    /// Append `other` onto `self` when both carry the same shape, otherwise
    /// `other` replaces `self`.
    pub fn accumulate(self, other: Payload) -> Payload {
        match (self, other) {
            (Payload::Electric(mut acc), Payload::Electric(next)) => {
                acc.currents.extend(next.currents);
                acc.voltages.extend(next.voltages);
                acc.grid_frequencies.extend(next.grid_frequencies);
                Payload::Electric(acc)
            }
            (Payload::GroupedElectric(mut acc), Payload::GroupedElectric(next)) => {
                acc.currents.append(next.currents);
                acc.voltages.append(next.voltages);
                acc.grid_frequencies.append(next.grid_frequencies);
                Payload::GroupedElectric(acc)
            }
            (Payload::Temperature(mut acc), Payload::Temperature(next)) => {
                acc.extend(next);
                Payload::Temperature(acc)
            }
            (Payload::GroupedTemperature(mut acc), Payload::GroupedTemperature(next)) => {
                acc.append(next);
                Payload::GroupedTemperature(acc)
            }
            (_, next) => next,
        }
    }
}
