//! Source readers.
//!
//! # Data Flow
//! ```text
//! process args ──▶ args.rs ──────────────▶ Arguments layer
//! properties   ──▶ properties.rs ─┬──────▶ Local layer
//!                   placeholder.rs┘ (location and values expanded once)
//! defaults.toml ─▶ defaults.rs ──────────▶ Defaults layer
//! ```
//!
//! Remote values are read by `crate::remote`; overrides come from the
//! bootstrap settings.

pub mod args;
pub mod defaults;
pub mod placeholder;
pub mod properties;

pub use args::read_arguments;
pub use defaults::bundled_defaults;
pub use placeholder::expand;
pub use properties::{read_properties, PropertiesLocation, SourceError};
