use crate::domain::aircraft::AircraftEntry;
use crate::domain::log_event::LogEvent;
use chrono::{DateTime, Utc};

pub const DEFAULT_SERVICE_TAG: &str = "adsb";

/// Converts decoded aircraft entries into log events.
///
/// Every event carries `service`, `aircraft.hex` and `aircraft.type`.
/// `aircraft.flight`, `aircraft.lat`, `aircraft.lon`, `aircraft.alt_baro` and
/// `aircraft.squawk` are only attached when non-empty / non-zero, so a
/// position of exactly 0.0 is dropped from the attributes (it still appears
/// in the body).
#[derive(Debug, Clone)]
pub struct RecordTransformer {
    service: String,
}

impl Default for RecordTransformer {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_TAG)
    }
}

impl RecordTransformer {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn transform(
        &self,
        entry: &AircraftEntry,
        body: String,
        timestamp: DateTime<Utc>,
        trace_id: Option<&str>,
    ) -> LogEvent {
        let mut event = LogEvent::new(timestamp, body)
            .with_attribute("service", self.service.as_str())
            .with_attribute("aircraft.hex", entry.hex.as_str())
            .with_attribute("aircraft.type", entry.address_type.as_str());

        // Callsigns are space padded to 8 characters by the receiver
        if let Some(flight) = non_blank(entry.flight.as_deref().map(str::trim)) {
            event = event.with_attribute("aircraft.flight", flight);
        }
        if let Some(lat) = entry.lat.filter(|v| *v != 0.0) {
            event = event.with_attribute("aircraft.lat", lat);
        }
        if let Some(lon) = entry.lon.filter(|v| *v != 0.0) {
            event = event.with_attribute("aircraft.lon", lon);
        }
        if !entry.alt_baro.is_empty() {
            event = event.with_attribute("aircraft.alt_baro", entry.alt_baro.as_str());
        }
        if let Some(squawk) = non_blank(entry.squawk.as_deref()) {
            event = event.with_attribute("aircraft.squawk", squawk);
        }

        event.trace_id = trace_id.map(str::to_string);
        event
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
