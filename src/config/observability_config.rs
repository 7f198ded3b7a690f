//! Observability configuration parsing from environment variables.
//!
//! This module handles the push-based metrics reporter and log output format.

use std::str::FromStr;

/// Process log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Invalid LOG_FORMAT: {}. Must be 'pretty' or 'json'", s),
        }
    }
}

/// Observability environment configuration
#[derive(Debug, Clone)]
pub struct ObservabilityEnvConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
    pub log_format: LogFormat,
}

impl Default for ObservabilityEnvConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 60,
            log_format: LogFormat::Pretty,
        }
    }
}

impl ObservabilityEnvConfig {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            enabled: lookup("OBSERVABILITY_ENABLED")
                .unwrap_or_else(|| "true".to_string())
                .parse::<bool>()
                .unwrap_or(true),
            interval_seconds: lookup("OBSERVABILITY_INTERVAL")
                .unwrap_or_else(|| "60".to_string())
                .parse::<u64>()
                .unwrap_or(60),
            log_format: lookup("LOG_FORMAT")
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observability_config_defaults() {
        let config = ObservabilityEnvConfig::from_lookup(|_| None);
        assert!(config.enabled);
        assert_eq!(config.interval_seconds, 60);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_observability_config_overrides() {
        let config = ObservabilityEnvConfig::from_lookup(|key| match key {
            "OBSERVABILITY_ENABLED" => Some("false".to_string()),
            "OBSERVABILITY_INTERVAL" => Some("15".to_string()),
            "LOG_FORMAT" => Some("JSON".to_string()),
            _ => None,
        });
        assert!(!config.enabled);
        assert_eq!(config.interval_seconds, 15);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ObservabilityEnvConfig::from_lookup(|key| match key {
            "OBSERVABILITY_INTERVAL" => Some("soon".to_string()),
            "LOG_FORMAT" => Some("xml".to_string()),
            _ => None,
        });
        assert_eq!(config.interval_seconds, 60);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }
}
