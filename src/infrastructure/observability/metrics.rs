//! Prometheus metrics definitions for Skylog
//!
//! All metrics use the `skylog_` prefix and are read-only.

use prometheus::{
    Counter, CounterVec, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge},
};
use std::sync::Arc;

/// Tick outcome labels, in reporting order
pub const TICK_OUTCOMES: [&str; 4] = [
    "success",
    "transport_error",
    "decode_error",
    "serialization_error",
];

/// Prometheus metrics for the polling pipeline
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Completed ticks by outcome
    pub ticks_total: CounterVec,
    /// Log events handed to the sink
    pub events_emitted_total: Counter,
    /// Aircraft in the most recently decoded document
    pub aircraft_tracked: GenericGauge<AtomicF64>,
    /// Receiver message counter from the most recent document
    pub receiver_messages: GenericGauge<AtomicF64>,
    /// Receiver fetch latency in seconds
    pub fetch_latency_seconds: Histogram,
    /// Sink export attempts by sink and status
    pub sink_pushes_total: CounterVec,
    /// Uptime in seconds
    pub uptime_seconds: GenericGauge<AtomicF64>,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let ticks_total = CounterVec::new(
            Opts::new("skylog_ticks_total", "Completed poll ticks by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(ticks_total.clone()))?;

        let events_emitted_total = Counter::with_opts(Opts::new(
            "skylog_events_emitted_total",
            "Aircraft log events handed to the sink",
        ))?;
        registry.register(Box::new(events_emitted_total.clone()))?;

        let aircraft_tracked = Gauge::with_opts(Opts::new(
            "skylog_aircraft_tracked",
            "Aircraft in the last receiver document",
        ))?;
        registry.register(Box::new(aircraft_tracked.clone()))?;

        let receiver_messages = Gauge::with_opts(Opts::new(
            "skylog_receiver_messages",
            "Cumulative messages decoded by the receiver",
        ))?;
        registry.register(Box::new(receiver_messages.clone()))?;

        let fetch_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "skylog_fetch_latency_seconds",
                "Receiver fetch latency in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
        )?;
        registry.register(Box::new(fetch_latency_seconds.clone()))?;

        let sink_pushes_total = CounterVec::new(
            Opts::new("skylog_sink_pushes_total", "Sink export attempts by status"),
            &["sink", "status"],
        )?;
        registry.register(Box::new(sink_pushes_total.clone()))?;

        let uptime_seconds = Gauge::with_opts(Opts::new(
            "skylog_uptime_seconds",
            "Process uptime in seconds",
        ))?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            ticks_total,
            events_emitted_total,
            aircraft_tracked,
            receiver_messages,
            fetch_latency_seconds,
            sink_pushes_total,
            uptime_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_tick(&self, outcome: &str) {
        self.ticks_total.with_label_values(&[outcome]).inc();
    }

    pub fn tick_count(&self, outcome: &str) -> u64 {
        self.ticks_total.with_label_values(&[outcome]).get() as u64
    }

    pub fn inc_sink_push(&self, sink: &str, status: &str) {
        self.sink_pushes_total
            .with_label_values(&[sink, status])
            .inc();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create default Metrics")
    }
}
