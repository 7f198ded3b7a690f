use crate::domain::log_event::LogEvent;
use crate::domain::ports::LogSink;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Forwards every event to each inner sink, in order
pub struct FanoutSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn LogSink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl LogSink for FanoutSink {
    fn name(&self) -> &'static str {
        "fanout"
    }

    async fn emit(&self, event: LogEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(event.clone()).await;
            }
            last.emit(event).await;
        }
    }

    async fn shutdown(&self) {
        for sink in &self.sinks {
            info!("Shutting down {} sink", sink.name());
            sink.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::RecordingSink;
    use chrono::Utc;

    #[tokio::test]
    async fn test_fanout_reaches_every_sink() {
        let first = Arc::new(RecordingSink::new());
        let second = Arc::new(RecordingSink::new());
        let sinks: Vec<Arc<dyn LogSink>> = vec![first.clone(), second.clone()];
        let fanout = FanoutSink::new(sinks);

        fanout.emit(LogEvent::new(Utc::now(), "a".to_string())).await;
        fanout.emit(LogEvent::new(Utc::now(), "b".to_string())).await;
        fanout.shutdown().await;

        assert_eq!(first.bodies(), vec!["a", "b"]);
        assert_eq!(second.bodies(), vec!["a", "b"]);
        assert!(first.is_shut_down());
        assert!(second.is_shut_down());
    }

    #[tokio::test]
    async fn test_empty_fanout_is_noop() {
        let fanout = FanoutSink::new(Vec::new());
        assert!(fanout.is_empty());
        fanout.emit(LogEvent::new(Utc::now(), "a".to_string())).await;
    }
}
