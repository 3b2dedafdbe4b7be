//! Telemetry for scrapbook binaries.
//!
//! Provides:
//! - Prometheus metrics recorder, rendered on demand
//! - Compact console tracing filtered by `RUST_LOG`
//!
//! # Usage
//!
//! ```ignore
//! use scrapbook_common::telemetry::{self, TelemetryConfig};
//!
//! fn main() -> miette::Result<()> {
//!     telemetry::init(TelemetryConfig::from_env("scrapbook"))?;
//!     tracing::info!("ready");
//!     println!("{}", telemetry::render().unwrap_or_default());
//!     Ok(())
//! }
//! ```

use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::ScrapbookError;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for labeling
    pub service_name: String,
    /// Console log level when `RUST_LOG` is unset (default: INFO, DEBUG in debug builds)
    pub console_level: Level,
}

impl TelemetryConfig {
    /// Load config from the environment. `RUST_LOG` overrides `console_level`.
    pub fn from_env(service_name: impl Into<String>) -> Self {
        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };

        Self {
            service_name: service_name.into(),
            console_level,
        }
    }

    pub fn with_console_level(mut self, level: Level) -> Self {
        self.console_level = level;
        self
    }
}

/// Initialize telemetry (metrics + tracing). Call once at startup.
pub fn init(config: TelemetryConfig) -> Result<(), ScrapbookError> {
    init_metrics()?;
    init_tracing(&config)?;
    tracing::debug!(service = %config.service_name, "telemetry initialized");
    Ok(())
}

/// Install the prometheus metrics recorder, or return the one already installed.
pub fn init_metrics() -> Result<&'static PrometheusHandle, ScrapbookError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle);
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ScrapbookError::Telemetry(e.to_string()))?;
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle))
}

fn init_tracing(config: &TelemetryConfig) -> Result<(), ScrapbookError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.console_level.as_str().to_lowercase()));

    // stdout is reserved for command output
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .try_init()
        .map_err(|e| ScrapbookError::Telemetry(e.to_string()))
}

/// Render metrics in prometheus text format, if the recorder is installed.
pub fn render() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(PrometheusHandle::render)
}

pub use metrics::counter;
