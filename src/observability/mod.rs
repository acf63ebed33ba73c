//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with key/value fields
//!     → logging.rs (EnvFilter + pretty/json fmt layer)
//!     → stdout
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - State transitions, layer loads, remote session changes, hook failures
//!   and extraction outcomes are always logged

pub mod logging;

pub use logging::{init_logging, LoggingError};
