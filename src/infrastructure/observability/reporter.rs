//! Push-based metrics reporter for Skylog
//!
//! Periodically outputs metrics as structured JSON to stderr, leaving stdout
//! to the event stream.
//!
//! **Security**: This system only SENDS data, never accepts requests.

use crate::infrastructure::observability::metrics::{Metrics, TICK_OUTCOMES};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Metrics snapshot for JSON output
#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub pipeline: PipelineSnapshot,
}

#[derive(Serialize)]
pub struct PipelineSnapshot {
    pub ticks: BTreeMap<String, u64>,
    pub events_emitted: u64,
    pub aircraft_tracked: u64,
    pub receiver_messages: u64,
    pub fetch_latency_avg_ms: Option<f64>,
}

/// Push-based metrics reporter
///
/// Outputs metrics as structured JSON logs on a configurable interval.
/// No HTTP server, no incoming connections - only outbound data.
pub struct MetricsReporter {
    metrics: Metrics,
    start_time: Instant,
    interval: Duration,
}

impl MetricsReporter {
    /// Create a new metrics reporter
    ///
    /// # Arguments
    /// * `metrics` - Shared Prometheus metrics
    /// * `interval_seconds` - How often to output metrics (default: 60)
    pub fn new(metrics: Metrics, interval_seconds: u64) -> Self {
        Self {
            metrics,
            start_time: Instant::now(),
            interval: Duration::from_secs(interval_seconds.max(1)),
        }
    }

    /// Run the reporter until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            "MetricsReporter: Starting push-based metrics (interval: {:?})",
            self.interval
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("MetricsReporter: Stopped");
                    return;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }

            let snapshot = self.collect_snapshot();
            match serde_json::to_string(&snapshot) {
                Ok(json) => {
                    // Use a special prefix so logs can be easily filtered
                    eprintln!("METRICS_JSON:{}", json);
                    info!(
                        "Aircraft: {} | Events emitted: {} | Uptime: {}s",
                        snapshot.pipeline.aircraft_tracked,
                        snapshot.pipeline.events_emitted,
                        snapshot.uptime_seconds
                    );
                }
                Err(e) => warn!("Failed to serialize metrics: {}", e),
            }
        }
    }

    /// Collect current metrics snapshot
    pub fn collect_snapshot(&self) -> MetricsSnapshot {
        let uptime = self.start_time.elapsed().as_secs();
        self.metrics.uptime_seconds.set(uptime as f64);

        let ticks = TICK_OUTCOMES
            .iter()
            .map(|outcome| (outcome.to_string(), self.metrics.tick_count(outcome)))
            .collect();

        let latency = &self.metrics.fetch_latency_seconds;
        let fetch_latency_avg_ms = match latency.get_sample_count() {
            0 => None,
            n => Some(latency.get_sample_sum() / n as f64 * 1000.0),
        };

        MetricsSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: uptime,
            version: env!("CARGO_PKG_VERSION").to_string(),
            pipeline: PipelineSnapshot {
                ticks,
                events_emitted: self.metrics.events_emitted_total.get() as u64,
                aircraft_tracked: self.metrics.aircraft_tracked.get() as u64,
                receiver_messages: self.metrics.receiver_messages.get() as u64,
                fetch_latency_avg_ms,
            },
        }
    }
}
