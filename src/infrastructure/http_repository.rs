// REST measurement store repository
use crate::application::telemetry_repository::{FetchError, TelemetryQuery, TelemetryRepository};
use crate::domain::electric::{ElectricData, GroupedElectricData, GroupedSeries, Payload, Phase, Quantity};
use crate::domain::surface::Subject;
use crate::infrastructure::wire::{
    self, ElectricDataDto, ElectricDataMinMaxMeanDto, TemperatureDto, TemperatureMinMaxMeanDto,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;

#[derive(Debug, Clone)]
pub struct HttpTelemetryRepository {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

/// Whether the endpoint answers raw samples or min/mean/max buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Aggregation {
    Raw,
    Grouped,
}

fn iso_segment(instant: DateTime<Utc>) -> String {
    let iso = instant.to_rfc3339_opts(SecondsFormat::Millis, true);
    urlencoding::encode(&iso).into_owned()
}

fn join_phases(phases: &std::collections::BTreeSet<Phase>) -> String {
    phases
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl HttpTelemetryRepository {
    pub fn new(base_url: String, token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            client: reqwest::Client::new(),
        }
    }

    fn root(subject: Subject) -> &'static str {
        match subject {
            Subject::Electric => "electric-quantities",
            Subject::Temperature => "temperature",
        }
    }

    fn build_url(&self, subject: Subject, suffix: &str) -> String {
        format!("{}/{}/{}", self.base_url, Self::root(subject), suffix)
    }

    /// Quantity and phase filters. Temperature endpoints take none.
    fn query_params(query: &TelemetryQuery) -> Vec<(&'static str, String)> {
        if query.subject == Subject::Temperature {
            return Vec::new();
        }
        let selection = &query.selection;
        let quantities = selection
            .quantities
            .iter()
            .map(Quantity::as_param)
            .collect::<Vec<_>>()
            .join(",");
        vec![
            ("electricQuantities", quantities),
            ("currentPhaseFilters", join_phases(&selection.current_phases)),
            ("voltagePhaseFilters", join_phases(&selection.voltage_phases)),
        ]
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &TelemetryQuery,
    ) -> Result<T, FetchError> {
        tracing::debug!(url = %url, "querying measurement store");

        let mut request = self
            .client
            .get(url)
            .query(&Self::query_params(query))
            .header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }

    async fn fetch(
        &self,
        suffix: String,
        aggregation: Aggregation,
        query: &TelemetryQuery,
    ) -> Result<Payload, FetchError> {
        let url = self.build_url(query.subject, &suffix);
        let payload = match (query.subject, aggregation) {
            (Subject::Electric, Aggregation::Raw) => {
                let dto: ElectricDataDto = self.get_json(&url, query).await?;
                Payload::Electric(ElectricData::from(dto))
            }
            (Subject::Electric, Aggregation::Grouped) => {
                let dto: ElectricDataMinMaxMeanDto = self.get_json(&url, query).await?;
                Payload::GroupedElectric(GroupedElectricData::from(dto))
            }
            (Subject::Temperature, Aggregation::Raw) => {
                let dtos: Vec<TemperatureDto> = self.get_json(&url, query).await?;
                Payload::Temperature(wire::temperatures(&dtos))
            }
            (Subject::Temperature, Aggregation::Grouped) => {
                let dto: TemperatureMinMaxMeanDto = self.get_json(&url, query).await?;
                Payload::GroupedTemperature(GroupedSeries::from(dto))
            }
        };
        Ok(payload)
    }
}

#[async_trait]
impl TelemetryRepository for HttpTelemetryRepository {
    async fn fetch_last(&self, query: &TelemetryQuery) -> Result<Payload, FetchError> {
        self.fetch("last".to_string(), Aggregation::Raw, query).await
    }

    async fn fetch_last_n(&self, n: usize, query: &TelemetryQuery) -> Result<Payload, FetchError> {
        self.fetch(format!("last/{}", n), Aggregation::Raw, query)
            .await
    }

    async fn fetch_since(
        &self,
        since: DateTime<Utc>,
        query: &TelemetryQuery,
    ) -> Result<Payload, FetchError> {
        self.fetch(format!("since/{}", iso_segment(since)), Aggregation::Raw, query)
            .await
    }

    async fn fetch_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        query: &TelemetryQuery,
    ) -> Result<Payload, FetchError> {
        let suffix = format!("{}/{}", iso_segment(start), iso_segment(end));
        self.fetch(suffix, Aggregation::Raw, query).await
    }

    async fn fetch_grouped_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        query: &TelemetryQuery,
    ) -> Result<Payload, FetchError> {
        let suffix = format!("grouped/{}/{}", iso_segment(start), iso_segment(end));
        self.fetch(suffix, Aggregation::Grouped, query).await
    }

    async fn fetch_grouped_since(
        &self,
        since: DateTime<Utc>,
        query: &TelemetryQuery,
    ) -> Result<Payload, FetchError> {
        let suffix = format!("grouped/since/{}", iso_segment(since));
        self.fetch(suffix, Aggregation::Grouped, query).await
    }
}
