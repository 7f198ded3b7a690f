//! One fetch → decode → transform → emit cycle.
//!
//! The pipeline is stateless between invocations apart from the reused HTTP
//! connection pool. Every failure is local to the tick that produced it.

use crate::application::transformer::RecordTransformer;
use crate::domain::aircraft::{AircraftEntry, SourceDocument};
use crate::domain::errors::{PipelineError, TransportError};
use crate::domain::ports::LogSink;
use crate::infrastructure::observability::{LatencyGuard, Metrics};
use chrono::Utc;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, field, trace, warn};
use url::Url;
use uuid::Uuid;

/// Outcome of a successful tick, for observability only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Aircraft in the decoded document
    pub aircraft: usize,
    /// Events handed to the sink
    pub emitted: usize,
    /// Receiver's cumulative message counter
    pub messages: u64,
}

/// Renders one aircraft entry into its log body
pub type BodyRenderer = fn(&AircraftEntry) -> Result<String, PipelineError>;

pub struct FetchPipeline {
    client: Client,
    url: Url,
    sink: Arc<dyn LogSink>,
    transformer: RecordTransformer,
    render_body: BodyRenderer,
    metrics: Metrics,
}

impl FetchPipeline {
    pub fn new(
        client: Client,
        url: Url,
        sink: Arc<dyn LogSink>,
        transformer: RecordTransformer,
        metrics: Metrics,
    ) -> Self {
        Self {
            client,
            url,
            sink,
            transformer,
            render_body: AircraftEntry::to_json_body,
            metrics,
        }
    }

    /// Replace the default JSON body rendering
    pub fn with_body_renderer(mut self, render_body: BodyRenderer) -> Self {
        self.render_body = render_body;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetch the receiver document and emit one event per aircraft.
    ///
    /// Cancelling `cancel` aborts an in-flight request. Once decoding has
    /// succeeded the remaining records are emitted without checking it again.
    /// A serialization failure stops at the failing record; events already
    /// emitted for this tick stay emitted.
    #[tracing::instrument(
        name = "pipeline.fetch_and_emit",
        skip_all,
        fields(
            url = %self.url,
            tick_id = field::Empty,
            http.status_code = field::Empty,
            aircraft.count = field::Empty,
            logs_emitted = field::Empty,
        )
    )]
    pub async fn fetch_and_emit(
        &self,
        cancel: &CancellationToken,
    ) -> Result<TickReport, PipelineError> {
        let tick_id = Uuid::new_v4().to_string();
        let span = Span::current();
        span.record("tick_id", tick_id.as_str());

        let document = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Fetch cancelled");
                return Err(TransportError::Cancelled.into());
            }
            result = self.fetch_document() => result?,
        };

        let timestamp = document.observed_at().unwrap_or_else(|| {
            warn!(now = document.now, "Receiver timestamp unusable, using local clock");
            Utc::now()
        });

        let aircraft_count = document.aircraft.len();
        span.record("aircraft.count", aircraft_count);
        self.metrics.aircraft_tracked.set(aircraft_count as f64);
        self.metrics.receiver_messages.set(document.messages as f64);
        debug!(
            aircraft_count,
            timestamp = document.now,
            messages = document.messages,
            "Successfully parsed flight data"
        );

        let mut emitted = 0;
        for (index, entry) in document.aircraft.iter().enumerate() {
            trace!(
                index,
                hex = %entry.hex,
                flight = ?entry.flight,
                lat = ?entry.lat,
                lon = ?entry.lon,
                alt_baro = %entry.alt_baro,
                "Processing aircraft"
            );

            let body = match (self.render_body)(entry) {
                Ok(body) => body,
                Err(e) => {
                    span.record("logs_emitted", emitted);
                    debug!(index, emitted, hex = %entry.hex, "Aborting tick, remaining records skipped");
                    return Err(e);
                }
            };
            let event = self
                .transformer
                .transform(entry, body, timestamp, Some(tick_id.as_str()));
            self.sink.emit(event).await;

            emitted += 1;
            self.metrics.events_emitted_total.inc();
        }

        span.record("logs_emitted", emitted);
        Ok(TickReport {
            aircraft: aircraft_count,
            emitted,
            messages: document.messages,
        })
    }

    async fn fetch_document(&self) -> Result<SourceDocument, PipelineError> {
        let latency = LatencyGuard::new(self.metrics.fetch_latency_seconds.clone());

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: self.url.to_string(),
                source,
            })?;

        let status = response.status();
        Span::current().record("http.status_code", status.as_u16());
        debug!(
            status = status.as_u16(),
            duration_ms = latency.elapsed().as_millis() as u64,
            "GET {}",
            self.url
        );

        if status != StatusCode::OK {
            return Err(TransportError::UnexpectedStatus { status }.into());
        }

        let body = response.bytes().await.map_err(TransportError::Body)?;
        drop(latency);

        SourceDocument::from_slice(&body)
    }
}
