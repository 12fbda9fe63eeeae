// Repository trait for telemetry data access
use crate::domain::electric::Payload;
use crate::domain::selection::SelectionDescriptor;
use crate::domain::surface::Subject;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failure talking to the measurement store. Every variant is terminal for the
/// fetch that produced it.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("measurement store answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode response: {0}")]
    Decode(String),
}

/// Subject plus the phase filters derived from the selection.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryQuery {
    pub subject: Subject,
    pub selection: SelectionDescriptor,
}

impl TelemetryQuery {
    pub fn new(subject: Subject, selection: SelectionDescriptor) -> Self {
        Self { subject, selection }
    }
}

#[async_trait]
pub trait TelemetryRepository: Send + Sync {
    /// Latest value per requested series.
    async fn fetch_last(&self, query: &TelemetryQuery) -> Result<Payload, FetchError>;

    /// Last `n` points per requested series.
    async fn fetch_last_n(&self, n: usize, query: &TelemetryQuery) -> Result<Payload, FetchError>;

    /// Raw points newer than `since`.
    async fn fetch_since(
        &self,
        since: DateTime<Utc>,
        query: &TelemetryQuery,
    ) -> Result<Payload, FetchError>;

    /// Raw points between `start` and `end`.
    async fn fetch_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        query: &TelemetryQuery,
    ) -> Result<Payload, FetchError>;

    /// Min/mean/max buckets between `start` and `end`.
    async fn fetch_grouped_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        query: &TelemetryQuery,
    ) -> Result<Payload, FetchError>;

    /// Min/mean/max buckets from `since` until now.
    async fn fetch_grouped_since(
        &self,
        since: DateTime<Utc>,
        query: &TelemetryQuery,
    ) -> Result<Payload, FetchError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// A recorded repository call.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Last,
        LastN(usize),
        Since(DateTime<Utc>),
        Range(DateTime<Utc>, DateTime<Utc>),
        GroupedRange(DateTime<Utc>, DateTime<Utc>),
        GroupedSince(DateTime<Utc>),
    }

    /// Scripted outcome for the next call.
    pub enum Scripted {
        Ok(Payload),
        Err(String),
        /// Answer after a delay (tokio time, so paused clocks apply).
        Delayed(Duration, Payload),
    }

    /// In-memory repository answering calls from a script, then from a
    /// fallback payload once the script runs dry.
    pub struct MockTelemetryRepository {
        script: Mutex<VecDeque<Scripted>>,
        fallback: Payload,
        calls: Mutex<Vec<(Call, TelemetryQuery)>>,
    }

    impl MockTelemetryRepository {
        pub fn new(fallback: Payload) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                fallback,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn push(&self, scripted: Scripted) {
            self.script.lock().unwrap().push_back(scripted);
        }

        pub fn calls(&self) -> Vec<(Call, TelemetryQuery)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        async fn answer(&self, call: Call, query: &TelemetryQuery) -> Result<Payload, FetchError> {
            self.calls.lock().unwrap().push((call, query.clone()));
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Scripted::Ok(payload)) => Ok(payload),
                Some(Scripted::Err(message)) => Err(FetchError::Status {
                    status: 500,
                    body: message,
                }),
                Some(Scripted::Delayed(delay, payload)) => {
                    tokio::time::sleep(delay).await;
                    Ok(payload)
                }
                None => Ok(self.fallback.clone()),
            }
        }
    }

    #[async_trait]
    impl TelemetryRepository for MockTelemetryRepository {
        async fn fetch_last(&self, query: &TelemetryQuery) -> Result<Payload, FetchError> {
            self.answer(Call::Last, query).await
        }

        async fn fetch_last_n(
            &self,
            n: usize,
            query: &TelemetryQuery,
        ) -> Result<Payload, FetchError> {
            self.answer(Call::LastN(n), query).await
        }

        async fn fetch_since(
            &self,
            since: DateTime<Utc>,
            query: &TelemetryQuery,
        ) -> Result<Payload, FetchError> {
            self.answer(Call::Since(since), query).await
        }

        async fn fetch_range(
            &self,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
            query: &TelemetryQuery,
        ) -> Result<Payload, FetchError> {
            self.answer(Call::Range(start, end), query).await
        }

        async fn fetch_grouped_range(
            &self,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
            query: &TelemetryQuery,
        ) -> Result<Payload, FetchError> {
            self.answer(Call::GroupedRange(start, end), query).await
        }

        async fn fetch_grouped_since(
            &self,
            since: DateTime<Utc>,
            query: &TelemetryQuery,
        ) -> Result<Payload, FetchError> {
            self.answer(Call::GroupedSince(since), query).await
        }
    }
}
