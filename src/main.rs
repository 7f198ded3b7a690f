//! Skylog - ADS-B receiver to structured log shipper
//!
//! Polls a dump1090/readsb `aircraft.json` endpoint every five seconds and
//! emits one structured log event per tracked aircraft.
//!
//! # Usage
//! ```sh
//! FLIGHT_DATA_URL=http://piaware.local/skyaware/data/aircraft.json cargo run
//! ```
//!
//! # Environment Variables
//! - `FLIGHT_DATA_URL` - Receiver endpoint (required)
//! - `LOG_SINKS` - `stdout`, `loki` or both, comma separated
//! - `LOKI_URL`, `LOKI_TENANT_ID`, `LOKI_PASSWORD` - Loki push target
//! - `LOG_FORMAT` - `pretty` (default) or `json` diagnostics on stderr
//! - `OBSERVABILITY_ENABLED` - Enable metrics reporting (default: true)

use anyhow::Result;
use skylog::application::system::Application;
use skylog::config::{Config, LogFormat, ObservabilityEnvConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let log_format = ObservabilityEnvConfig::from_lookup(|key| std::env::var(key).ok()).log_format;
    init_logging(log_format);

    info!("Skylog {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: Receiver={}, Service={}, Sinks={:?}",
        config.flight_data_url, config.service_tag, config.sinks.kinds
    );

    let app = Application::build(config).await?;

    let cancel = CancellationToken::new();
    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_termination(shutdown.clone()));

    info!("Receiver poller running. Press Ctrl+C to shutdown.");
    let summary = app.run(cancel, shutdown).await;

    info!(
        "Exiting after {} ticks ({} failed, {} events emitted)",
        summary.ticks, summary.failures, summary.emitted
    );
    Ok(())
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // stdout is reserved for emitted events
    match format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .pretty(),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

/// Cancel `shutdown` on SIGINT or SIGTERM
async fn wait_for_termination(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    };

    info!(signal, "Shutdown signal received. Finishing current tick...");
    shutdown.cancel();
}
