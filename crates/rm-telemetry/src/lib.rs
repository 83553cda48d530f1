//! # Retrieval Market Telemetry
//!
//! Logging and metrics shared by the retrieval-market engines.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` fmt layer with an `EnvFilter`, plain or JSON
//! - **Metrics**: Prometheus counters and histograms in a process-wide registry
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rm_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RM_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter directive |
//! | `RM_JSON_LOGS` | `false` | Emit JSON formatted logs |
//! | `RM_SERVICE_NAME` | `retrieval-market` | Service name attached to logs |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, CACHE_EVICTIONS, CLIENT_REQUESTS_SUBMITTED,
    CLIENT_RESPONSES_DISPATCHED, CLIENT_RESPONSES_MALFORMED, CLIENT_RESPONSES_RECEIVED,
    CLIENT_RESPONSES_UNMATCHED, PROVIDER_REPLY_DURATION, PROVIDER_REPLY_FAILURES,
    PROVIDER_REQUESTS_MALFORMED, PROVIDER_REQUESTS_RECEIVED, PROVIDER_RESPONSES_SENT,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Install logging and register metrics.
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
