use crate::domain::log_event::LogEvent;
use async_trait::async_trait;

/// Destination for completed log events.
///
/// Sinks buffer and export on their own schedule. `emit` reports nothing back:
/// export failures are the sink's concern and are logged there.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Short identifier used in logs and metric labels
    fn name(&self) -> &'static str;

    async fn emit(&self, event: LogEvent);

    /// Flush anything still buffered. Called once on process shutdown.
    async fn shutdown(&self) {}
}
