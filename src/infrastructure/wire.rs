// JSON shapes returned by the measurement store, and their domain mapping
use crate::domain::electric::{
    ElectricData, GroupedElectricData, GroupedSeries, Phase, RawPoint,
};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CurrentDto {
    pub current: f64,
    pub time: String,
    pub phase: String,
}

#[derive(Debug, Deserialize)]
pub struct VoltageDto {
    pub voltage: f64,
    pub time: String,
    pub phase: String,
}

#[derive(Debug, Deserialize)]
pub struct GridFrequencyDto {
    pub frequency: f64,
    pub time: String,
}

#[derive(Debug, Deserialize)]
pub struct TemperatureDto {
    pub temperature: f64,
    pub time: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectricDataDto {
    #[serde(default)]
    pub currents: Vec<CurrentDto>,
    #[serde(default)]
    pub voltages: Vec<VoltageDto>,
    #[serde(default)]
    pub grid_frequencies: Vec<GridFrequencyDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectricDataMinMaxMeanDto {
    #[serde(default)]
    pub min_currents: Vec<CurrentDto>,
    #[serde(default)]
    pub mean_currents: Vec<CurrentDto>,
    #[serde(default)]
    pub max_currents: Vec<CurrentDto>,
    #[serde(default)]
    pub min_voltages: Vec<VoltageDto>,
    #[serde(default)]
    pub mean_voltages: Vec<VoltageDto>,
    #[serde(default)]
    pub max_voltages: Vec<VoltageDto>,
    #[serde(default)]
    pub min_grid_frequencies: Vec<GridFrequencyDto>,
    #[serde(default)]
    pub mean_grid_frequencies: Vec<GridFrequencyDto>,
    #[serde(default)]
    pub max_grid_frequencies: Vec<GridFrequencyDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureMinMaxMeanDto {
    #[serde(default)]
    pub min_temperatures: Vec<TemperatureDto>,
    #[serde(default)]
    pub mean_temperatures: Vec<TemperatureDto>,
    #[serde(default)]
    pub max_temperatures: Vec<TemperatureDto>,
}

const LOCAL_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// RFC 3339, or an ISO timestamp without offset read as local time.
fn parse_time(time: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(time) {
        return Some(parsed.with_timezone(&Utc));
    }
    match NaiveDateTime::parse_from_str(time, LOCAL_TIME_FORMAT) {
        Ok(naive) => local_to_utc(&Local, naive).or_else(|| {
            tracing::debug!("Dropping point with nonexistent local time {}", time);
            None
        }),
        Err(e) => {
            tracing::debug!("Dropping point with unparseable time {}: {}", time, e);
            None
        }
    }
}

fn local_to_utc<Tz: TimeZone>(zone: &Tz, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    zone.from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}

fn phased(value: f64, time: &str, phase: &str) -> Option<RawPoint> {
    let Some(phase) = Phase::parse(phase) else {
        tracing::debug!("Dropping point with unknown phase {}", phase);
        return None;
    };
    parse_time(time).map(|t| RawPoint::new(value, t, Some(phase)))
}

fn currents(dtos: &[CurrentDto]) -> Vec<RawPoint> {
    dtos.iter()
        .filter_map(|d| phased(d.current, &d.time, &d.phase))
        .collect()
}

fn voltages(dtos: &[VoltageDto]) -> Vec<RawPoint> {
    dtos.iter()
        .filter_map(|d| phased(d.voltage, &d.time, &d.phase))
        .collect()
}

fn frequencies(dtos: &[GridFrequencyDto]) -> Vec<RawPoint> {
    dtos.iter()
        .filter_map(|d| parse_time(&d.time).map(|t| RawPoint::new(d.frequency, t, None)))
        .collect()
}

pub fn temperatures(dtos: &[TemperatureDto]) -> Vec<RawPoint> {
    dtos.iter()
        .filter_map(|d| parse_time(&d.time).map(|t| RawPoint::new(d.temperature, t, None)))
        .collect()
}

impl From<ElectricDataDto> for ElectricData {
    fn from(dto: ElectricDataDto) -> Self {
        ElectricData {
            currents: currents(&dto.currents),
            voltages: voltages(&dto.voltages),
            grid_frequencies: frequencies(&dto.grid_frequencies),
        }
    }
}

impl From<ElectricDataMinMaxMeanDto> for GroupedElectricData {
    fn from(dto: ElectricDataMinMaxMeanDto) -> Self {
        GroupedElectricData {
            currents: GroupedSeries {
                min: currents(&dto.min_currents),
                mean: currents(&dto.mean_currents),
                max: currents(&dto.max_currents),
            },
            voltages: GroupedSeries {
                min: voltages(&dto.min_voltages),
                mean: voltages(&dto.mean_voltages),
                max: voltages(&dto.max_voltages),
            },
            grid_frequencies: GroupedSeries {
                min: frequencies(&dto.min_grid_frequencies),
                mean: frequencies(&dto.mean_grid_frequencies),
                max: frequencies(&dto.max_grid_frequencies),
            },
        }
    }
}

impl From<TemperatureMinMaxMeanDto> for GroupedSeries {
    fn from(dto: TemperatureMinMaxMeanDto) -> Self {
        GroupedSeries {
            min: temperatures(&dto.min_temperatures),
            mean: temperatures(&dto.mean_temperatures),
            max: temperatures(&dto.max_temperatures),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_electric_payload_mapping() {
        let body = r#"{
            "currents": [
                {"current": 3.5, "time": "2024-03-10T10:00:00Z", "phase": "L1"},
                {"current": 3.7, "time": "not a time", "phase": "L1"},
                {"current": 3.9, "time": "2024-03-10T10:00:00Z", "phase": "N"}
            ],
            "gridFrequencies": [
                {"frequency": 50.02, "time": "2024-03-10T10:00:00.250+01:00"}
            ]
        }"#;
        let dto: ElectricDataDto = serde_json::from_str(body).unwrap();
        let data = ElectricData::from(dto);

        assert_eq!(data.currents.len(), 1);
        assert_eq!(data.currents[0].phase, Some(Phase::L1));
        assert!(data.voltages.is_empty());
        assert_eq!(data.grid_frequencies[0].time_ms(), 1_710_061_200_250);
    }

    #[test]
    fn test_grouped_payload_mapping() {
        let body = r#"{
            "minVoltages": [{"voltage": 228.0, "time": "2024-03-10T10:00:00Z", "phase": "L2"}],
            "meanVoltages": [{"voltage": 230.0, "time": "2024-03-10T10:00:00Z", "phase": "L2"}],
            "maxVoltages": [{"voltage": 232.0, "time": "2024-03-10T10:00:00Z", "phase": "L2"}]
        }"#;
        let dto: ElectricDataMinMaxMeanDto = serde_json::from_str(body).unwrap();
        let data = GroupedElectricData::from(dto);

        assert_eq!(data.voltages.mean[0].value, 230.0);
        assert_eq!(data.currents, GroupedSeries::default());
        assert_eq!(data.grid_frequencies, GroupedSeries::default());
    }

    #[test]
    fn test_time_without_offset_is_local() {
        let body = r#"[
            {"temperature": 21.0, "time": "2024-03-10T10:00:00"},
            {"temperature": 21.5, "time": "2024-03-10T10:00:05.500"}
        ]"#;
        let dtos: Vec<TemperatureDto> = serde_json::from_str(body).unwrap();
        let points = temperatures(&dtos);

        let naive = NaiveDateTime::parse_from_str("2024-03-10T10:00:05.500", LOCAL_TIME_FORMAT).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(Some(points[1].time), local_to_utc(&Local, naive));
        assert_eq!(points[1].time_ms() - points[0].time_ms(), 5_500);
    }

    #[test]
    fn test_local_time_uses_zone_offset() {
        let zone = chrono::FixedOffset::east_opt(3600).unwrap();
        let naive = NaiveDateTime::parse_from_str("2024-03-10T10:00:00", LOCAL_TIME_FORMAT).unwrap();

        assert_eq!(
            local_to_utc(&zone, naive),
            Some(Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_temperature_mapping() {
        let body = r#"[{"temperature": 21.25, "time": "2024-03-10T10:00:00Z"}]"#;
        let dtos: Vec<TemperatureDto> = serde_json::from_str(body).unwrap();
        let points = temperatures(&dtos);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].phase, None);
    }
}
