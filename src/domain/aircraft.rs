//! Receiver status document (`aircraft.json`) as published by dump1090-fa and readsb.
//!
//! Decoding is permissive: unknown fields are ignored and any field missing
//! from an object takes its default. Upstream omits fields depending on which
//! message types were heard for an aircraft, so absence is normal.

use crate::domain::errors::PipelineError;
use crate::domain::flexible::FlexibleScalar;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Snapshot of receiver state at one point in time
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceDocument {
    /// Receiver clock, epoch seconds
    #[serde(deserialize_with = "null_as_default")]
    pub now: f64,
    /// Cumulative messages decoded by the receiver
    #[serde(deserialize_with = "null_as_default")]
    pub messages: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub aircraft: Vec<AircraftEntry>,
}

impl SourceDocument {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PipelineError> {
        serde_json::from_slice(bytes).map_err(PipelineError::Decode)
    }

    /// Receiver timestamp, millisecond precision.
    ///
    /// Returns `None` when `now` is not a representable instant.
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        if !self.now.is_finite() {
            return None;
        }
        let millis = (self.now * 1000.0).round();
        if millis < i64::MIN as f64 || millis > i64::MAX as f64 {
            return None;
        }
        let observed = Utc.timestamp_millis_opt(millis as i64).single()?;
        // Sinks export nanosecond timestamps; reject instants they cannot encode
        observed.timestamp_nanos_opt()?;
        Some(observed)
    }
}

/// One tracked aircraft.
///
/// `hex` is the ICAO 24-bit address and identifies the aircraft within a
/// document. Optional telemetry is `None` when the receiver omitted it, which
/// keeps a reported zero distinguishable from a missing value in the log body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AircraftEntry {
    #[serde(deserialize_with = "null_as_default")]
    pub hex: String,
    /// Address/message source type, e.g. `adsb_icao`, `mlat`, `tisb_trackfile`
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub address_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight: Option<String>,

    // Registration database enrichment (readsb)
    #[serde(rename = "r", skip_serializing_if = "Option::is_none")]
    pub registration: Option<String>,
    #[serde(rename = "t", skip_serializing_if = "Option::is_none")]
    pub type_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(rename = "ownOp", skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(rename = "dbFlags", skip_serializing_if = "Option::is_none")]
    pub db_flags: Option<i64>,

    #[serde(skip_serializing_if = "FlexibleScalar::is_empty")]
    pub alt_baro: FlexibleScalar,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_geom: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ias: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tas: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mach: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wd: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mag_heading: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub true_heading: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baro_rate: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geom_rate: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub squawk: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    // Autopilot / FMS selections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nav_qnh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nav_altitude_mcp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nav_altitude_fms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nav_heading: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nav_modes: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nic: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rc: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seen_pos: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_dst: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_dir: Option<f64>,

    // Accuracy and integrity codes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nic_baro: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nac_p: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nac_v: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sil: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sil_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gva: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sda: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spi: Option<i64>,

    /// Field names derived from MLAT / TIS-B rather than ADS-B
    #[serde(deserialize_with = "null_as_default")]
    pub mlat: Vec<serde_json::Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub tisb: Vec<serde_json::Value>,

    #[serde(deserialize_with = "null_as_default")]
    pub messages: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub seen: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub rssi: f64,

    #[serde(rename = "lastPosition", skip_serializing_if = "Option::is_none")]
    pub last_position: Option<LastPosition>,
}

/// Last known position once the current one has gone stale (readsb)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LastPosition {
    #[serde(deserialize_with = "null_as_default")]
    pub lat: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub lon: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub nic: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub rc: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub seen_pos: f64,
}

/// A `null` in a required field takes the type's default instead of failing
/// the whole document.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl AircraftEntry {
    /// JSON log body for this entry; omitted telemetry stays omitted
    pub fn to_json_body(&self) -> Result<String, PipelineError> {
        serde_json::to_string(self).map_err(|source| PipelineError::Serialization {
            hex: self.hex.clone(),
            source,
        })
    }
}
