//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Select pretty (development) or JSON (production) output
//! - Let `RUST_LOG` override the configured level
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging; every subsystem logs with
//!   key/value fields rather than formatted strings
//! - A second initialization is a no-op, so tests and embedders may call it freely

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Unsupported log format '{0}', expected 'pretty' or 'json'")]
    UnsupportedFormat(String),
}

/// Install the global subscriber.
///
/// Returns `Ok(false)` when a subscriber was already installed.
pub fn init_logging(level: &str, format: &str) -> Result<bool, LoggingError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match format {
        "json" => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        "pretty" => registry.with(tracing_subscriber::fmt::layer().pretty()).try_init(),
        other => return Err(LoggingError::UnsupportedFormat(other.to_string())),
    };

    Ok(installed.is_ok())
}
