use crate::domain::log_event::{AttributeValue, LogEvent};
use crate::domain::ports::LogSink;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use tracing::warn;

#[derive(Serialize)]
struct StdoutRecord<'a> {
    timestamp: String,
    severity_text: &'static str,
    severity_number: u8,
    body: &'a str,
    attributes: BTreeMap<&'a str, &'a AttributeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace_id: Option<&'a str>,
}

/// Writes one JSON object per event to stdout, for collectors tailing the
/// container output (Promtail, Fluent Bit, Vector).
#[derive(Debug, Default, Clone)]
pub struct StdoutSink;

impl StdoutSink {
    pub fn new() -> Self {
        Self
    }

    pub fn render(event: &LogEvent) -> serde_json::Result<String> {
        let record = StdoutRecord {
            timestamp: event.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            severity_text: event.severity.as_str(),
            severity_number: event.severity.number(),
            body: &event.body,
            attributes: event
                .attributes
                .iter()
                .map(|(k, v)| (k.as_str(), v))
                .collect(),
            trace_id: event.trace_id.as_deref(),
        };
        serde_json::to_string(&record)
    }
}

#[async_trait]
impl LogSink for StdoutSink {
    fn name(&self) -> &'static str {
        "stdout"
    }

    async fn emit(&self, event: LogEvent) {
        let line = match Self::render(&event) {
            Ok(line) => line,
            Err(e) => {
                warn!("StdoutSink: Failed to render event: {}", e);
                return;
            }
        };

        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{}", line) {
            warn!("StdoutSink: Failed to write event: {}", e);
        }
    }

    async fn shutdown(&self) {
        if let Err(e) = std::io::stdout().lock().flush() {
            warn!("StdoutSink: Failed to flush stdout: {}", e);
        }
    }
}
