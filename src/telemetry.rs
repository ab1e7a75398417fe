//! Tracing subscriber setup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LogFormat, ServerConfig};

/// Builds the log filter: `RUST_LOG` when set, otherwise the configured level.
pub fn env_filter(config: &ServerConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global tracing subscriber.
///
/// Returns an error if a subscriber is already installed.
pub fn init_tracing(config: &ServerConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = env_filter(config);

    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init()?,
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_line_number(true))
            .try_init()?,
    }

    tracing::info!(
        environment = config.environment.as_str(),
        log_format = ?config.log_format,
        "Tracing initialized"
    );
    Ok(())
}
