//! Bootstrap settings subsystem.
//!
//! # Data Flow
//! ```text
//! bootstrap.toml (optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BootstrapConfig
//!     → CLI flags applied on top (launcher)
//!     → assembly / lifecycle / extraction
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal (or absent) files
//! - Validation separates syntactic (serde) from semantic checks
//! - These settings never enter the application's own configuration,
//!   except the `[overrides]` table which becomes the overrides layer

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, DEFAULT_CONFIG_PATH};
pub use schema::{BootstrapConfig, LocalSettings, LoggingSettings, RemoteSettings};
pub use validation::{validate_config, ValidationError};
