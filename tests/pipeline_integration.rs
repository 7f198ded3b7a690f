use chrono::{TimeZone, Utc};
use serde_json::json;
use skylog::application::pipeline::FetchPipeline;
use skylog::application::poll_loop::{PollLoop, PollState};
use skylog::application::transformer::RecordTransformer;
use skylog::domain::aircraft::AircraftEntry;
use skylog::domain::errors::{PipelineError, TransportError};
use skylog::domain::log_event::{AttributeValue, Severity};
use skylog::infrastructure::HttpClientFactory;
use skylog::infrastructure::mock::RecordingSink;
use skylog::infrastructure::observability::Metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AIRCRAFT_PATH: &str = "/skyaware/data/aircraft.json";

struct Harness {
    server: MockServer,
    sink: RecordingSink,
    metrics: Metrics,
    pipeline: FetchPipeline,
}

async fn harness() -> Harness {
    let server = MockServer::start().await;
    let sink = RecordingSink::new();
    let metrics = Metrics::new().unwrap();
    let url = Url::parse(&format!("{}{}", server.uri(), AIRCRAFT_PATH)).unwrap();
    let pipeline = FetchPipeline::new(
        HttpClientFactory::create_client(),
        url,
        Arc::new(sink.clone()),
        RecordTransformer::default(),
        metrics.clone(),
    );
    Harness {
        server,
        sink,
        metrics,
        pipeline,
    }
}

async fn respond(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(AIRCRAFT_PATH))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_zero_position_is_not_an_attribute() {
    let h = harness().await;
    respond(
        &h.server,
        ResponseTemplate::new(200).set_body_string(
            r#"{"now":1700000000,"messages":10,"aircraft":[{"hex":"abc123","type":"adsb_icao","lat":0,"lon":0}]}"#,
        ),
    )
    .await;

    let report = h.pipeline.fetch_and_emit(&CancellationToken::new()).await.unwrap();

    assert_eq!(report.aircraft, 1);
    assert_eq!(report.emitted, 1);
    assert_eq!(report.messages, 10);

    let events = h.sink.events();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.severity, Severity::Info);
    assert_eq!(event.timestamp, Utc.timestamp_opt(1_700_000_000, 0).unwrap());
    assert_eq!(
        event.attribute("aircraft.hex"),
        Some(&AttributeValue::from("abc123"))
    );
    assert_eq!(
        event.attribute("aircraft.type"),
        Some(&AttributeValue::from("adsb_icao"))
    );
    assert!(event.attribute("aircraft.lat").is_none());
    assert!(event.attribute("aircraft.lon").is_none());
    assert!(event.trace_id.is_some());
}

#[tokio::test]
async fn test_events_follow_document_order() {
    let h = harness().await;
    respond(
        &h.server,
        ResponseTemplate::new(200).set_body_json(json!({
            "now": 1700000000.25,
            "messages": 4242,
            "aircraft": [
                {"hex": "aaa111", "type": "adsb_icao", "flight": "BAW123  ", "alt_baro": "ground"},
                {"hex": "bbb222", "type": "mlat", "lat": 51.47, "lon": -0.45, "alt_baro": 25000.7},
                {"hex": "ccc333", "type": "adsb_icao", "squawk": "7700", "alt_baro": null}
            ]
        })),
    )
    .await;

    let report = h.pipeline.fetch_and_emit(&CancellationToken::new()).await.unwrap();
    assert_eq!(report.emitted, 3);

    let events = h.sink.events();
    let hexes: Vec<String> = events
        .iter()
        .filter_map(|e| e.attribute("aircraft.hex").map(|v| v.to_string()))
        .collect();
    assert_eq!(hexes, vec!["aaa111", "bbb222", "ccc333"]);

    assert_eq!(
        events[0].attribute("aircraft.flight"),
        Some(&AttributeValue::from("BAW123"))
    );
    assert_eq!(
        events[0].attribute("aircraft.alt_baro"),
        Some(&AttributeValue::from("ground"))
    );
    assert_eq!(
        events[1].attribute("aircraft.lat"),
        Some(&AttributeValue::Double(51.47))
    );
    assert_eq!(
        events[1].attribute("aircraft.alt_baro"),
        Some(&AttributeValue::from("25001"))
    );
    assert!(events[2].attribute("aircraft.alt_baro").is_none());
    assert_eq!(
        events[2].attribute("aircraft.squawk"),
        Some(&AttributeValue::from("7700"))
    );

    // All events of one tick share its trace id and timestamp
    assert!(events.iter().all(|e| e.trace_id == events[0].trace_id));
    assert_eq!(events[0].timestamp.timestamp_subsec_millis(), 250);

    let body: serde_json::Value = serde_json::from_str(&events[1].body).unwrap();
    assert_eq!(body["hex"], "bbb222");
    assert_eq!(body["alt_baro"], "25001");
}

#[tokio::test]
async fn test_each_tick_gets_a_new_trace_id() {
    let h = harness().await;
    respond(
        &h.server,
        ResponseTemplate::new(200).set_body_json(json!({
            "now": 1700000000,
            "aircraft": [{"hex": "abc123", "type": "adsb_icao"}]
        })),
    )
    .await;

    let cancel = CancellationToken::new();
    h.pipeline.fetch_and_emit(&cancel).await.unwrap();
    h.pipeline.fetch_and_emit(&cancel).await.unwrap();

    let events = h.sink.events();
    assert_eq!(events.len(), 2);
    assert_ne!(events[0].trace_id, events[1].trace_id);
}

#[tokio::test]
async fn test_service_unavailable_is_transport_error() {
    let h = harness().await;
    respond(&h.server, ResponseTemplate::new(503)).await;

    let err = h
        .pipeline
        .fetch_and_emit(&CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        PipelineError::Transport(TransportError::UnexpectedStatus { status }) => {
            assert_eq!(status.as_u16(), 503)
        }
        other => panic!("expected status error, got {other:?}"),
    }
    assert!(h.sink.is_empty());
}

#[tokio::test]
async fn test_non_ok_success_status_is_rejected() {
    let h = harness().await;
    respond(&h.server, ResponseTemplate::new(204)).await;

    let err = h
        .pipeline
        .fetch_and_emit(&CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "transport_error");
    assert!(h.sink.is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let h = harness().await;
    respond(
        &h.server,
        ResponseTemplate::new(200).set_body_string(r#"{"now": 1700000000, "aircraft": ["#),
    )
    .await;

    let err = h
        .pipeline
        .fetch_and_emit(&CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "decode_error");
    assert!(h.sink.is_empty());
}

#[tokio::test]
async fn test_object_altitude_is_decode_error() {
    let h = harness().await;
    respond(
        &h.server,
        ResponseTemplate::new(200).set_body_json(json!({
            "now": 1700000000,
            "aircraft": [
                {"hex": "aaa111", "type": "adsb_icao"},
                {"hex": "bbb222", "type": "adsb_icao", "alt_baro": {"ft": 1000}}
            ]
        })),
    )
    .await;

    let err = h
        .pipeline
        .fetch_and_emit(&CancellationToken::new())
        .await
        .unwrap_err();

    // The whole document is rejected, not just the bad entry
    assert_eq!(err.kind(), "decode_error");
    assert!(h.sink.is_empty());
}

#[tokio::test]
async fn test_empty_aircraft_list_emits_nothing() {
    let h = harness().await;
    respond(
        &h.server,
        ResponseTemplate::new(200).set_body_json(json!({"now": 1700000000, "messages": 1, "aircraft": []})),
    )
    .await;

    let report = h.pipeline.fetch_and_emit(&CancellationToken::new()).await.unwrap();

    assert_eq!(report.aircraft, 0);
    assert_eq!(report.emitted, 0);
    assert!(h.sink.is_empty());
}

#[tokio::test]
async fn test_request_carries_user_agent() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path(AIRCRAFT_PATH))
        .and(header(
            "user-agent",
            concat!("skylog/", env!("CARGO_PKG_VERSION")),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"aircraft": []})))
        .expect(1)
        .mount(&h.server)
        .await;

    h.pipeline.fetch_and_emit(&CancellationToken::new()).await.unwrap();
}

#[tokio::test]
async fn test_cancellation_aborts_request() {
    let h = harness().await;
    respond(
        &h.server,
        ResponseTemplate::new(200)
            .set_body_json(json!({"aircraft": [{"hex": "abc123"}]}))
            .set_delay(Duration::from_secs(10)),
    )
    .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = tokio::time::timeout(Duration::from_secs(2), h.pipeline.fetch_and_emit(&cancel))
        .await
        .expect("request was not aborted")
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(h.sink.is_empty());
}

#[tokio::test]
async fn test_metrics_track_last_document() {
    let h = harness().await;
    respond(
        &h.server,
        ResponseTemplate::new(200).set_body_json(json!({
            "now": 1700000000,
            "messages": 77,
            "aircraft": [{"hex": "aaa111"}, {"hex": "bbb222"}]
        })),
    )
    .await;

    h.pipeline.fetch_and_emit(&CancellationToken::new()).await.unwrap();

    assert_eq!(h.metrics.aircraft_tracked.get(), 2.0);
    assert_eq!(h.metrics.receiver_messages.get(), 77.0);
    assert_eq!(h.metrics.events_emitted_total.get(), 2.0);
    assert_eq!(h.metrics.fetch_latency_seconds.get_sample_count(), 1);
}

fn reject_ccc333(entry: &AircraftEntry) -> Result<String, PipelineError> {
    if entry.hex == "ccc333" {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        return Err(PipelineError::Serialization {
            hex: entry.hex.clone(),
            source,
        });
    }
    entry.to_json_body()
}

#[tokio::test]
async fn test_serialization_failure_truncates_tick() {
    let server = MockServer::start().await;
    respond(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "now": 1700000000,
            "aircraft": [
                {"hex": "aaa111"},
                {"hex": "bbb222"},
                {"hex": "ccc333"},
                {"hex": "ddd444"}
            ]
        })),
    )
    .await;

    let sink = RecordingSink::new();
    let metrics = Metrics::new().unwrap();
    let url = Url::parse(&format!("{}{}", server.uri(), AIRCRAFT_PATH)).unwrap();
    let pipeline = FetchPipeline::new(
        HttpClientFactory::create_client(),
        url,
        Arc::new(sink.clone()),
        RecordTransformer::default(),
        metrics.clone(),
    )
    .with_body_renderer(reject_ccc333);
    let mut poll_loop = PollLoop::new(pipeline, metrics.clone());

    let err = poll_loop.tick(&CancellationToken::new()).await.unwrap_err();

    assert_eq!(err.kind(), "serialization_error");
    assert!(err.to_string().contains("ccc333"));

    // Records before the failing one stay emitted, the tail is skipped
    let hexes: Vec<String> = sink
        .events()
        .iter()
        .filter_map(|e| e.attribute("aircraft.hex").map(|v| v.to_string()))
        .collect();
    assert_eq!(hexes, vec!["aaa111", "bbb222"]);

    assert_eq!(metrics.tick_count("serialization_error"), 1);
    assert_eq!(metrics.events_emitted_total.get(), 2.0);
    assert_eq!(poll_loop.state(), PollState::Idle);
    assert_eq!(poll_loop.summary().failures, 1);
}
