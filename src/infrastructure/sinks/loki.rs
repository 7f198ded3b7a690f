//! Batching Grafana Loki push client.
//!
//! Events are queued on a bounded channel and a background worker pushes them
//! to `/loki/api/v1/push` once `batch_size` events are waiting or
//! `flush_interval` has elapsed. Push failures are logged and counted, the
//! batch is dropped: there is no retry and no local persistence.

use crate::config::LokiConfig;
use crate::domain::log_event::LogEvent;
use crate::domain::ports::LogSink;
use crate::infrastructure::observability::Metrics;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value, json};
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

const SINK_NAME: &str = "loki";

#[derive(Debug, Error)]
pub enum LokiError {
    #[error("Loki push request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Loki authentication failed: {0}")]
    Unauthorized(StatusCode),

    #[error("Loki rejected push with status {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

/// Stateless half of the sink: payload building and the HTTP push
pub struct LokiPusher {
    client: Client,
    config: LokiConfig,
    service: String,
}

impl LokiPusher {
    pub fn new(client: Client, config: LokiConfig, service: &str) -> Self {
        Self {
            client,
            config,
            service: service.to_string(),
        }
    }

    /// Build the push payload. All events share one stream; per-aircraft
    /// attributes go to structured metadata to keep label cardinality low.
    pub fn build_payload(&self, batch: &[LogEvent]) -> Value {
        let values: Vec<Value> = batch
            .iter()
            .map(|event| {
                let ts = entry_timestamp(event);
                if self.config.structured_metadata {
                    json!([ts, event.body, structured_metadata(event)])
                } else {
                    json!([ts, event.body])
                }
            })
            .collect();

        json!({
            "streams": [{
                "stream": {
                    "service": self.service,
                    "source": self.config.source_label,
                },
                "values": values,
            }]
        })
    }

    pub async fn push(&self, batch: &[LogEvent]) -> Result<(), LokiError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut request = self
            .client
            .post(self.config.push_url())
            .json(&self.build_payload(batch));
        if let Some((user, pass)) = self.config.credentials() {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(LokiError::Unauthorized(status));
        }
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(LokiError::Rejected { status, body });
        }

        debug!(entries = batch.len(), status = status.as_u16(), "Pushed batch to Loki");
        Ok(())
    }
}

/// Entry timestamp in Unix nanoseconds. Loki rejects the whole batch on an
/// unparseable entry, so instants outside the `i64` nanosecond range use the
/// local clock instead.
fn entry_timestamp(event: &LogEvent) -> String {
    event
        .timestamp
        .timestamp_nanos_opt()
        .or_else(|| {
            warn!(timestamp = %event.timestamp, "Event timestamp not encodable for Loki, using local clock");
            Utc::now().timestamp_nanos_opt()
        })
        .unwrap_or_default()
        .to_string()
}

/// Loki label names cannot contain dots
fn metadata_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn structured_metadata(event: &LogEvent) -> Value {
    let mut metadata = Map::new();
    for (key, value) in &event.attributes {
        metadata.insert(metadata_key(key), Value::String(value.to_string()));
    }
    if let Some(trace_id) = &event.trace_id {
        metadata.insert("trace_id".to_string(), Value::String(trace_id.clone()));
    }
    Value::Object(metadata)
}

/// [`LogSink`] backed by a background [`LokiPusher`] worker
pub struct LokiSink {
    tx: Mutex<Option<mpsc::Sender<LogEvent>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl LokiSink {
    /// Spawn the push worker. Must be called inside a Tokio runtime.
    pub fn start(pusher: LokiPusher, metrics: Metrics) -> Self {
        let batch_size = pusher.config.batch_size.max(1);
        let (tx, rx) = mpsc::channel(batch_size * 4);
        let worker = tokio::spawn(run_worker(pusher, rx, metrics, batch_size));

        Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    fn sender(&self) -> Option<mpsc::Sender<LogEvent>> {
        self.tx.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl LogSink for LokiSink {
    fn name(&self) -> &'static str {
        SINK_NAME
    }

    async fn emit(&self, event: LogEvent) {
        let Some(tx) = self.sender() else {
            warn!("LokiSink: Sink already shut down, dropping event");
            return;
        };
        if tx.send(event).await.is_err() {
            warn!("LokiSink: Worker stopped, dropping event");
        }
    }

    async fn shutdown(&self) {
        // Dropping the last sender lets the worker drain and exit
        if let Ok(mut guard) = self.tx.lock() {
            guard.take();
        }
        let worker = self.worker.lock().ok().and_then(|mut guard| guard.take());
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!("LokiSink: Worker panicked during shutdown: {}", e);
            }
        }
    }
}

async fn run_worker(
    pusher: LokiPusher,
    mut rx: mpsc::Receiver<LogEvent>,
    metrics: Metrics,
    batch_size: usize,
) {
    let mut buffer: Vec<LogEvent> = Vec::with_capacity(batch_size);
    let mut ticker = tokio::time::interval(pusher.config.flush_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(event) => {
                        buffer.push(event);
                        if buffer.len() >= batch_size {
                            flush(&pusher, &mut buffer, &metrics).await;
                        }
                    }
                    None => {
                        flush(&pusher, &mut buffer, &metrics).await;
                        debug!("LokiSink: Channel closed, worker exiting");
                        return;
                    }
                }
            }
            _ = ticker.tick() => {
                flush(&pusher, &mut buffer, &metrics).await;
            }
        }
    }
}

async fn flush(pusher: &LokiPusher, buffer: &mut Vec<LogEvent>, metrics: &Metrics) {
    if buffer.is_empty() {
        return;
    }

    match pusher.push(buffer).await {
        Ok(()) => metrics.inc_sink_push(SINK_NAME, "ok"),
        Err(e @ LokiError::Unauthorized(_)) => {
            metrics.inc_sink_push(SINK_NAME, "unauthorized");
            error!(entries = buffer.len(), error = %e, "Loki authentication failed, batch dropped");
        }
        Err(e) => {
            metrics.inc_sink_push(SINK_NAME, "error");
            warn!(entries = buffer.len(), error = %e, "Loki push failed, batch dropped");
        }
    }
    buffer.clear();
}
