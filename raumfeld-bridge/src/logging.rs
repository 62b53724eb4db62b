//! Logging setup for the bridge binary.
//!
//! `RUST_LOG` takes precedence; otherwise the level from the command line
//! (or `RAUMFELD_LOG_LEVEL`) is used for every target.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid log filter {0:?}")]
    InvalidFilter(String),
}

/// Install a compact stderr subscriber.
pub fn init_logging(level: &str) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = create_env_filter(std::env::var("RUST_LOG").ok(), level)?;

    Registry::default()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .with(filter)
        .try_init()
        .map_err(|e| LoggingError::TracingInit(e.to_string()))
}

fn create_env_filter(rust_log: Option<String>, level: &str) -> Result<EnvFilter, LoggingError> {
    let directives = rust_log
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| level.to_lowercase());

    EnvFilter::try_new(&directives).map_err(|_| LoggingError::InvalidFilter(directives))
}
