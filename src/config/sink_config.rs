//! Log sink configuration parsing.
//!
//! Sinks are selected with `LOG_SINKS` (comma separated: `stdout`, `loki`).
//! When unset, Loki is used if `LOKI_URL` is present, stdout otherwise.

use anyhow::{Context, Result, bail};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Stdout,
    Loki,
}

impl FromStr for SinkKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stdout" => Ok(SinkKind::Stdout),
            "loki" => Ok(SinkKind::Loki),
            _ => bail!("Invalid log sink: {}. Must be 'stdout' or 'loki'", s),
        }
    }
}

/// Loki push API configuration
#[derive(Debug, Clone)]
pub struct LokiConfig {
    /// Base URL, `/loki/api/v1/push` is appended
    pub url: Url,
    /// Basic auth user (Grafana Cloud instance id)
    pub tenant_id: Option<String>,
    pub password: Option<String>,
    pub batch_size: usize,
    pub flush_interval: Duration,
    /// Value of the `source` stream label
    pub source_label: String,
    /// Attach attributes as Loki 3 structured metadata
    pub structured_metadata: bool,
}

impl LokiConfig {
    pub const DEFAULT_BATCH_SIZE: usize = 500;
    pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 1000;

    pub fn new(url: Url) -> Self {
        Self {
            url,
            tenant_id: None,
            password: None,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            flush_interval: Duration::from_millis(Self::DEFAULT_FLUSH_INTERVAL_MS),
            source_label: "adsb".to_string(),
            structured_metadata: true,
        }
    }

    /// Basic auth is only used when both halves are configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.tenant_id.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }

    pub fn push_url(&self) -> String {
        format!("{}/loki/api/v1/push", self.url.as_str().trim_end_matches('/'))
    }
}

/// Aggregated sink configuration
#[derive(Debug, Clone)]
pub struct SinkEnvConfig {
    pub kinds: Vec<SinkKind>,
    pub loki: Option<LokiConfig>,
}

impl SinkEnvConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let loki = match lookup("LOKI_URL").filter(|v| !v.trim().is_empty()) {
            Some(raw) => {
                let url = Url::parse(raw.trim())
                    .with_context(|| format!("Invalid LOKI_URL: {}", raw))?;
                let mut config = LokiConfig::new(url);
                config.tenant_id = lookup("LOKI_TENANT_ID");
                config.password = lookup("LOKI_PASSWORD");
                if let Some(size) = lookup("LOKI_BATCH_SIZE") {
                    config.batch_size = size
                        .parse::<usize>()
                        .context("Failed to parse LOKI_BATCH_SIZE")?
                        .max(1);
                }
                if let Some(ms) = lookup("LOKI_FLUSH_INTERVAL_MS") {
                    let ms = ms
                        .parse::<u64>()
                        .context("Failed to parse LOKI_FLUSH_INTERVAL_MS")?;
                    config.flush_interval = Duration::from_millis(ms.max(1));
                }
                if let Some(label) = lookup("LOKI_SOURCE_LABEL").filter(|v| !v.is_empty()) {
                    config.source_label = label;
                }
                if let Some(flag) = lookup("LOKI_STRUCTURED_METADATA") {
                    config.structured_metadata = flag
                        .parse::<bool>()
                        .context("Failed to parse LOKI_STRUCTURED_METADATA")?;
                }
                Some(config)
            }
            None => None,
        };

        let kinds = match lookup("LOG_SINKS").filter(|v| !v.trim().is_empty()) {
            Some(raw) => {
                let mut kinds = Vec::new();
                for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
                    let kind = part.parse::<SinkKind>()?;
                    if !kinds.contains(&kind) {
                        kinds.push(kind);
                    }
                }
                kinds
            }
            None if loki.is_some() => vec![SinkKind::Loki],
            None => vec![SinkKind::Stdout],
        };

        if kinds.contains(&SinkKind::Loki) && loki.is_none() {
            bail!("LOG_SINKS includes 'loki' but LOKI_URL is not set");
        }

        Ok(Self { kinds, loki })
    }
}
