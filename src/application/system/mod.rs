use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub mod shutdown_service;

use crate::application::{
    pipeline::FetchPipeline,
    poll_loop::{PollLoop, PollSummary},
    system::shutdown_service::{ReporterHandle, ShutdownService},
    transformer::RecordTransformer,
};
use crate::config::{Config, SinkKind};
use crate::domain::ports::LogSink;
use crate::infrastructure::HttpClientFactory;
use crate::infrastructure::observability::{Metrics, MetricsReporter};
use crate::infrastructure::sinks::{FanoutSink, LokiPusher, LokiSink, StdoutSink};

/// Loki pushes are small and frequent; fail them faster than receiver fetches
const LOKI_PUSH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Application {
    pub config: Config,
    pub metrics: Metrics,
    pub sink: Arc<dyn LogSink>,
    poll_loop: PollLoop,
}

impl Application {
    /// Wire sinks, pipeline and poll loop from configuration.
    ///
    /// Must run inside a Tokio runtime: the Loki sink spawns its push worker here.
    pub async fn build(config: Config) -> Result<Self> {
        info!(
            "Building Skylog Application (receiver: {}, sinks: {:?})...",
            config.flight_data_url, config.sinks.kinds
        );

        let metrics = Metrics::new()?;
        let sink = build_sink(&config, &metrics)?;
        Ok(Self::with_sink(config, sink, metrics))
    }

    /// Wire the application around an already constructed sink
    pub fn with_sink(config: Config, sink: Arc<dyn LogSink>, metrics: Metrics) -> Self {
        let pipeline = FetchPipeline::new(
            HttpClientFactory::create_client(),
            config.flight_data_url.clone(),
            sink.clone(),
            RecordTransformer::new(&config.service_tag),
            metrics.clone(),
        );
        let poll_loop = PollLoop::new(pipeline, metrics.clone());

        Self {
            config,
            metrics,
            sink,
            poll_loop,
        }
    }

    /// Poll until `shutdown` or `cancel` fires, then run the shutdown sequence
    pub async fn run(mut self, cancel: CancellationToken, shutdown: CancellationToken) -> PollSummary {
        let reporter = if self.config.observability.enabled {
            let reporter_cancel = CancellationToken::new();
            let reporter = MetricsReporter::new(
                self.metrics.clone(),
                self.config.observability.interval_seconds,
            );
            let task = tokio::spawn(reporter.run(reporter_cancel.clone()));
            Some(ReporterHandle {
                cancel: reporter_cancel,
                task,
            })
        } else {
            None
        };

        let summary = self.poll_loop.run(&cancel, &shutdown).await;

        ShutdownService::new(self.sink.clone(), reporter, self.metrics.clone())
            .shutdown(summary)
            .await;

        summary
    }
}

fn build_sink(config: &Config, metrics: &Metrics) -> Result<Arc<dyn LogSink>> {
    let mut sinks: Vec<Arc<dyn LogSink>> = Vec::with_capacity(config.sinks.kinds.len());

    for kind in &config.sinks.kinds {
        match kind {
            SinkKind::Stdout => {
                info!("Writing log events to stdout");
                sinks.push(Arc::new(StdoutSink::new()));
            }
            SinkKind::Loki => {
                let loki = config
                    .sinks
                    .loki
                    .clone()
                    .context("Loki sink selected but not configured")?;
                info!(
                    url = %loki.push_url(),
                    authenticated = loki.credentials().is_some(),
                    batch_size = loki.batch_size,
                    "Pushing log events to Loki"
                );
                let client = HttpClientFactory::create_client_with_timeout(LOKI_PUSH_TIMEOUT);
                let pusher = LokiPusher::new(client, loki, &config.service_tag);
                sinks.push(Arc::new(LokiSink::start(pusher, metrics.clone())));
            }
        }
    }

    if sinks.len() == 1 {
        Ok(sinks.remove(0))
    } else {
        Ok(Arc::new(FanoutSink::new(sinks)))
    }
}
