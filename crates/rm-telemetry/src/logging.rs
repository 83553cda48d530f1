//! Structured logging setup.
//!
//! Installs a global `tracing` subscriber. Engines never log through a global
//! logger of their own; they carry a `tracing::Span` handed in at
//! construction and every event they emit is recorded inside it.

use tracing_subscriber::EnvFilter;

use crate::{TelemetryConfig, TelemetryError};

/// Install the global fmt subscriber described by `config`.
///
/// Returns `Ok(())` without changes when a global subscriber already exists.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("log level '{}': {}", config.log_level, e)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    match installed {
        Ok(()) => {
            tracing::debug!(
                service = %config.service_name,
                json_logs = config.json_logs,
                "Logging initialized"
            );
        }
        Err(e) => {
            tracing::debug!(error = %e, "Global subscriber already set, keeping it");
        }
    }

    Ok(())
}
