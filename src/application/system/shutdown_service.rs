use crate::application::poll_loop::PollSummary;
use crate::domain::ports::LogSink;
use crate::infrastructure::observability::Metrics;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Background metrics reporter owned by the shutdown sequence
pub struct ReporterHandle {
    pub cancel: CancellationToken,
    pub task: JoinHandle<()>,
}

pub struct ShutdownService {
    sink: Arc<dyn LogSink>,
    reporter: Option<ReporterHandle>,
    metrics: Metrics,
}

impl ShutdownService {
    pub fn new(sink: Arc<dyn LogSink>, reporter: Option<ReporterHandle>, metrics: Metrics) -> Self {
        Self {
            sink,
            reporter,
            metrics,
        }
    }

    /// Runs once the poll loop has stopped. Never fails; each step logs its
    /// own errors.
    pub async fn shutdown(self, summary: PollSummary) {
        info!("Initiating Graceful Shutdown Sequence...");

        info!("Step 1: Stopping metrics reporter...");
        if let Some(reporter) = self.reporter {
            reporter.cancel.cancel();
            if let Err(e) = reporter.task.await {
                error!("Metrics reporter task failed during shutdown: {}", e);
            }
        } else {
            info!("Metrics reporter not running.");
        }

        info!("Step 2: Flushing log sink '{}'...", self.sink.name());
        self.sink.shutdown().await;

        info!(
            ticks = summary.ticks,
            failures = summary.failures,
            logs_emitted = summary.emitted,
            successful_ticks = self.metrics.tick_count("success"),
            "Step 3: Final pipeline summary"
        );

        info!("Graceful Shutdown Complete. Goodbye!");
    }
}
