//! Configuration module for Skylog.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Receiver, Sinks, and Observability.

mod observability_config;
mod sink_config;

pub use observability_config::{LogFormat, ObservabilityEnvConfig};
pub use sink_config::{LokiConfig, SinkEnvConfig, SinkKind};

use anyhow::{Context, Result};
use std::env;
use url::Url;

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Receiver status endpoint, e.g. `http://piaware.local/skyaware/data/aircraft.json`
    pub flight_data_url: Url,
    /// Value of the `service` attribute on every event
    pub service_tag: String,
    pub sinks: SinkEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup("FLIGHT_DATA_URL")
            .filter(|v| !v.trim().is_empty())
            .context("FLIGHT_DATA_URL must be set")?;
        let flight_data_url = Url::parse(raw_url.trim())
            .with_context(|| format!("Invalid FLIGHT_DATA_URL: {}", raw_url))?;
        if !matches!(flight_data_url.scheme(), "http" | "https") {
            anyhow::bail!(
                "Invalid FLIGHT_DATA_URL scheme: {}. Must be http or https",
                flight_data_url.scheme()
            );
        }

        let service_tag = lookup("SERVICE_TAG")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| crate::application::transformer::DEFAULT_SERVICE_TAG.to_string());

        Ok(Self {
            flight_data_url,
            service_tag,
            sinks: SinkEnvConfig::from_lookup(&lookup)?,
            observability: ObservabilityEnvConfig::from_lookup(&lookup),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_missing_url_is_error() {
        let err = config_from(&[]).unwrap_err();
        assert!(err.to_string().contains("FLIGHT_DATA_URL"));
    }

    #[test]
    fn test_invalid_url_is_error() {
        assert!(config_from(&[("FLIGHT_DATA_URL", "not a url")]).is_err());
        assert!(config_from(&[("FLIGHT_DATA_URL", "ftp://receiver/aircraft.json")]).is_err());
    }

    #[test]
    fn test_minimal_config() {
        let config = tokio_test::assert_ok!(config_from(&[(
            "FLIGHT_DATA_URL",
            "http://192.168.1.20:8080/data/aircraft.json"
        )]));

        assert_eq!(config.flight_data_url.path(), "/data/aircraft.json");
        assert_eq!(config.service_tag, "adsb");
        assert_eq!(config.sinks.kinds, vec![SinkKind::Stdout]);
        assert!(config.observability.enabled);
    }

    #[test]
    fn test_sink_errors_propagate() {
        let err = config_from(&[
            ("FLIGHT_DATA_URL", "http://receiver/data/aircraft.json"),
            ("LOG_SINKS", "loki"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("LOKI_URL"));
    }
}
