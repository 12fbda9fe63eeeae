//! Fetch coordination for a single visual surface.
//!
//! A [`FetchCoordinator`] owns the one outstanding request (and, in live mode,
//! the one poll timer) of its surface. Every issued request is tagged with a
//! generation; a response is applied only if its generation is still the
//! current one, so late answers from superseded selections, windows or
//! abandoned poll ticks are dropped.
//!
//! The coordinator runs as a single task ([`FetchCoordinator::run`]) fed by
//! [`SurfaceCommand`]s. Requests run in their own tasks and report back over a
//! channel, so the coordinator itself never blocks.

use crate::application::series_builder::SeriesBuilder;
use crate::application::surface_sink::{Severity, SurfaceSink};
use crate::application::telemetry_repository::{FetchError, TelemetryQuery, TelemetryRepository};
use crate::domain::axis::{bounds_for, AxisBounds};
use crate::domain::electric::Payload;
use crate::domain::selection::SelectionDescriptor;
use crate::domain::surface::{HistorySource, LiveSource, Subject, SurfaceConfig};
use crate::domain::telemetry::point_count;
use crate::domain::window::{FetchPlan, TimeWindowPolicy, WindowMode};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

const ERROR_SUMMARY: &str = "Server error has occurred";
const EMPTY_SUMMARY: &str = "No data found";

/// Input from the selection widget and the window dropdown.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCommand {
    SelectionChanged(Vec<String>),
    WindowChanged(WindowMode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Fetching,
    Polling,
}

/// The currently outstanding request. Dropping it stops listening for the
/// result; the remote call may still finish but nobody will read it.
#[derive(Debug)]
pub struct FetchHandle {
    generation: u64,
    task: JoinHandle<()>,
}

impl FetchHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn release(self) {
        debug!(generation = self.generation, "releasing fetch handle");
    }
}

impl Drop for FetchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A finished request, reported back to the coordinator.
#[derive(Debug)]
pub struct FetchOutcome {
    generation: u64,
    issued_at: DateTime<Utc>,
    result: Result<Payload, FetchError>,
}

/// The repository call a plan turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchSpan {
    Last,
    LastN(usize),
    Since(DateTime<Utc>),
    Range(DateTime<Utc>, DateTime<Utc>),
    GroupedRange(DateTime<Utc>, DateTime<Utc>),
    GroupedSince(DateTime<Utc>),
}

impl FetchSpan {
    async fn execute(
        self,
        repository: &dyn TelemetryRepository,
        query: &TelemetryQuery,
    ) -> Result<Payload, FetchError> {
        match self {
            FetchSpan::Last => repository.fetch_last(query).await,
            FetchSpan::LastN(n) => repository.fetch_last_n(n, query).await,
            FetchSpan::Since(since) => repository.fetch_since(since, query).await,
            FetchSpan::Range(start, end) => repository.fetch_range(start, end, query).await,
            FetchSpan::GroupedRange(start, end) => {
                repository.fetch_grouped_range(start, end, query).await
            }
            FetchSpan::GroupedSince(since) => repository.fetch_grouped_since(since, query).await,
        }
    }
}

pub struct FetchCoordinator {
    surface_id: u64,
    config: SurfaceConfig,
    policy: TimeWindowPolicy,
    builder: SeriesBuilder,
    repository: Arc<dyn TelemetryRepository>,
    sink: Arc<dyn SurfaceSink>,
    selection: SelectionDescriptor,
    window: WindowMode,
    plan: Option<FetchPlan>,
    generation: u64,
    in_flight: Option<FetchHandle>,
    timer: Option<Interval>,
    /// Live `since` cursor: issue time of the last applied fetch.
    cursor: Option<DateTime<Utc>>,
    buffer: Option<Payload>,
    loading: bool,
    outcome_tx: mpsc::UnboundedSender<FetchOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<FetchOutcome>,
}

impl FetchCoordinator {
    pub fn new(
        surface_id: u64,
        config: SurfaceConfig,
        repository: Arc<dyn TelemetryRepository>,
        sink: Arc<dyn SurfaceSink>,
        selection: SelectionDescriptor,
        window: WindowMode,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            surface_id,
            policy: TimeWindowPolicy::new(config.poll_interval, config.lookback()),
            builder: SeriesBuilder::new(config.shape),
            config,
            repository,
            sink,
            selection,
            window,
            plan: None,
            generation: 0,
            in_flight: None,
            timer: None,
            cursor: None,
            buffer: None,
            loading: false,
            outcome_tx,
            outcome_rx,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        if self.timer.is_some() {
            CoordinatorState::Polling
        } else if self.in_flight.is_some() {
            CoordinatorState::Fetching
        } else {
            CoordinatorState::Idle
        }
    }

    /// Number of requests the surface is still listening for (0 or 1).
    pub fn outstanding(&self) -> usize {
        usize::from(self.in_flight.is_some())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drive the surface until the command channel closes, then tear down.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SurfaceCommand>) {
        self.start();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                Some(outcome) = self.outcome_rx.recv() => self.apply(outcome),
                _ = next_tick(&mut self.timer) => self.on_tick(),
            }
        }

        self.teardown();
    }

    /// Surface init: first fetch for the initial selection and window.
    pub fn start(&mut self) {
        info!(
            surface = self.surface_id,
            kind = %self.config.kind,
            "starting surface"
        );
        self.restart();
    }

    pub fn handle(&mut self, command: SurfaceCommand) {
        match command {
            SurfaceCommand::SelectionChanged(nodes) => {
                self.on_selection_changed(&nodes);
            }
            SurfaceCommand::WindowChanged(mode) => self.on_window_changed(mode),
        }
    }

    /// Returns `false` when the selection is unchanged and nothing was fetched.
    pub fn on_selection_changed<S: AsRef<str>>(&mut self, nodes: &[S]) -> bool {
        let selection = SelectionDescriptor::from_nodes(nodes);
        if selection == self.selection && self.plan.is_some() {
            debug!(surface = self.surface_id, "selection unchanged, keeping current fetch");
            return false;
        }

        self.selection = selection;
        self.restart();
        true
    }

    pub fn on_window_changed(&mut self, mode: WindowMode) {
        self.window = mode;
        self.restart();
    }

    /// Cancel whatever is running, resolve the window afresh and issue the
    /// first fetch. Accumulated live data never survives a restart.
    fn restart(&mut self) {
        debug!(surface = self.surface_id, state = ?self.state(), "restarting surface");
        self.release();
        self.buffer = None;
        self.cursor = None;

        let now = Utc::now();
        let plan = self.policy.resolve(&self.window, now);
        self.plan = Some(plan);

        if let FetchPlan::Live {
            poll_interval,
            lookback,
        } = plan
        {
            let mut interval = tokio::time::interval_at(Instant::now() + poll_interval, poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.timer = Some(interval);
            self.cursor = Some(lookback);
        }

        self.set_loading(true);
        self.issue(now);
    }

    fn on_tick(&mut self) {
        if let Some(handle) = &self.in_flight {
            debug!(
                surface = self.surface_id,
                generation = handle.generation(),
                "poll tick overtook outstanding request, abandoning it"
            );
        }
        self.issue(Utc::now());
    }

    /// Issue a request for the current plan, replacing any outstanding one.
    fn issue(&mut self, issued_at: DateTime<Utc>) {
        let Some(plan) = self.plan else {
            return;
        };

        if let Some(previous) = self.in_flight.take() {
            previous.release();
        }

        self.generation += 1;
        let generation = self.generation;
        let span = self.span_for(&plan);
        let query = TelemetryQuery::new(self.config.subject, self.selection.clone());
        let repository = self.repository.clone();
        let tx = self.outcome_tx.clone();

        debug!(
            surface = self.surface_id,
            generation,
            span = ?span,
            "issuing fetch"
        );

        let task = tokio::spawn(async move {
            let result = span.execute(repository.as_ref(), &query).await;
            let _ = tx.send(FetchOutcome {
                generation,
                issued_at,
                result,
            });
        });

        self.in_flight = Some(FetchHandle { generation, task });
    }

    fn span_for(&self, plan: &FetchPlan) -> FetchSpan {
        match *plan {
            FetchPlan::Live { lookback, .. } => match self.config.live_source {
                LiveSource::Last => FetchSpan::Last,
                LiveSource::LastN => FetchSpan::LastN(self.config.last_n),
                LiveSource::Since => FetchSpan::Since(self.cursor.unwrap_or(lookback)),
            },
            FetchPlan::OneShot {
                start,
                end,
                open_ended,
            } => match (self.config.history_source, open_ended) {
                (HistorySource::Raw, false) => FetchSpan::Range(start, end),
                (HistorySource::Raw, true) => FetchSpan::Since(start),
                (HistorySource::Grouped, false) => FetchSpan::GroupedRange(start, end),
                (HistorySource::Grouped, true) => FetchSpan::GroupedSince(start),
            },
        }
    }

    /// Apply a finished request if it belongs to the current generation. A
    /// current answer also retires the outstanding handle.
    pub fn apply(&mut self, outcome: FetchOutcome) {
        if outcome.generation != self.generation {
            debug!(
                surface = self.surface_id,
                generation = outcome.generation,
                current = self.generation,
                "discarding stale response"
            );
            return;
        }

        self.in_flight = None;

        match outcome.result {
            Ok(payload) => self.render(payload, outcome.issued_at),
            Err(e) => {
                warn!(
                    surface = self.surface_id,
                    generation = outcome.generation,
                    error = %e,
                    "fetch failed, keeping previous series"
                );
                self.sink.on_notify(Severity::Error, ERROR_SUMMARY, &e.to_string());
            }
        }

        self.set_loading(false);
    }

    fn render(&mut self, payload: Payload, issued_at: DateTime<Utc>) {
        let live = matches!(self.plan, Some(FetchPlan::Live { .. }));
        let buffer = if live && self.config.accumulates() {
            self.cursor = Some(issued_at);
            match self.buffer.take() {
                Some(existing) => existing.accumulate(payload),
                None => payload,
            }
        } else {
            payload
        };

        let mut series = self.builder.build(&buffer, &self.selection);
        if point_count(&series) == 0 {
            series.clear();
            self.sink
                .on_notify(Severity::Warn, EMPTY_SUMMARY, &self.empty_detail());
        }

        let unit = SeriesBuilder::unit(self.config.subject == Subject::Temperature, &self.selection);
        let bounds = self.axis_bounds();
        debug!(
            surface = self.surface_id,
            generation = self.generation(),
            points = point_count(&series),
            calibrated = bounds.is_calibrated(),
            "series updated"
        );
        self.sink.on_series_updated(series, bounds, unit);
        self.buffer = Some(buffer);
    }

    fn axis_bounds(&self) -> AxisBounds {
        match self.config.subject {
            Subject::Electric => bounds_for(self.selection.primary_quantity()),
            Subject::Temperature => AxisBounds::UNCALIBRATED,
        }
    }

    fn empty_detail(&self) -> String {
        match self.plan {
            Some(FetchPlan::Live { lookback, .. }) => {
                format!("No data found for date {}.", lookback.format("%Y-%m-%d"))
            }
            Some(FetchPlan::OneShot {
                start,
                open_ended: true,
                ..
            }) => format!("No data found for date {}.", start.format("%Y-%m-%d")),
            Some(FetchPlan::OneShot { start, end, .. }) => format!(
                "No data found between dates {} and {}.",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            ),
            None => "No data found.".to_string(),
        }
    }

    fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.sink.on_loading_state_changed(loading);
        }
    }

    /// Drop the poll timer and stop listening for the outstanding request.
    fn release(&mut self) {
        self.timer = None;
        if let Some(handle) = self.in_flight.take() {
            handle.release();
        }
    }

    /// Back to idle. Anything still in the pipe is stale from here on.
    pub fn teardown(&mut self) {
        let abandoned = self.outstanding();
        self.release();
        self.generation += 1;
        self.plan = None;
        self.buffer = None;
        info!(surface = self.surface_id, abandoned, "surface torn down");
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
