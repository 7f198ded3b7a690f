use crate::application::pipeline::{FetchPipeline, TickReport};
use crate::domain::errors::PipelineError;
use crate::infrastructure::observability::Metrics;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Fixed delay between ticks
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Waiting for the next tick or shutdown
    Idle,
    /// Pipeline in flight
    Running,
    /// Terminal
    Stopped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub ticks: u64,
    pub failures: u64,
    pub emitted: u64,
}

/// Drives the pipeline on a fixed interval.
///
/// Ticks run to completion one at a time: a slow receiver or sink delays the
/// next tick and never overlaps it. A failed tick is logged and the loop waits
/// for the next scheduled one.
pub struct PollLoop {
    pipeline: FetchPipeline,
    metrics: Metrics,
    interval: Duration,
    state: PollState,
    summary: PollSummary,
}

impl PollLoop {
    pub fn new(pipeline: FetchPipeline, metrics: Metrics) -> Self {
        Self::with_interval(pipeline, metrics, POLL_INTERVAL)
    }

    pub(crate) fn with_interval(
        pipeline: FetchPipeline,
        metrics: Metrics,
        interval: Duration,
    ) -> Self {
        Self {
            pipeline,
            metrics,
            interval,
            state: PollState::Idle,
            summary: PollSummary::default(),
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn summary(&self) -> PollSummary {
        self.summary
    }

    /// Run until `shutdown` (termination signal) or `cancel` (external
    /// cancellation) fires.
    ///
    /// `cancel` also aborts an in-flight request. `shutdown` never interrupts
    /// a tick: the current one finishes and the loop stops before the next.
    pub async fn run(
        &mut self,
        cancel: &CancellationToken,
        shutdown: &CancellationToken,
    ) -> PollSummary {
        if self.state == PollState::Stopped {
            return self.summary;
        }

        info!(
            interval_secs = self.interval.as_secs_f64(),
            url = %self.pipeline.url(),
            "Starting data fetch loop"
        );

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, stopping poll loop");
                    break;
                }
                _ = cancel.cancelled() => {
                    debug!("Context cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    debug!("Ticker fired - fetching data");
                    let _ = self.tick(cancel).await;
                }
            }
        }

        self.state = PollState::Stopped;
        info!(
            ticks = self.summary.ticks,
            failures = self.summary.failures,
            emitted = self.summary.emitted,
            "Poll loop stopped"
        );
        self.summary
    }

    /// Run a single Idle → Running → Idle transition and log the outcome
    pub async fn tick(&mut self, cancel: &CancellationToken) -> Result<TickReport, PipelineError> {
        self.state = PollState::Running;
        let result = self.pipeline.fetch_and_emit(cancel).await;
        self.state = PollState::Idle;
        self.summary.ticks += 1;

        match &result {
            Ok(report) => {
                self.metrics.inc_tick("success");
                self.summary.emitted += report.emitted as u64;
                info!(
                    aircraft_count = report.aircraft,
                    logs_emitted = report.emitted,
                    "Successfully fetched and pushed aircraft data"
                );
            }
            Err(e) => {
                self.metrics.inc_tick(e.kind());
                self.summary.failures += 1;
                if e.is_cancelled() {
                    debug!("Tick cancelled before completion");
                } else {
                    error!(error_kind = e.kind(), error = %e, "Error fetching and pushing data");
                }
            }
        }

        result
    }
}
