//! Configuration extraction subsystem.
//!
//! # Data Flow
//! ```text
//! Configuration::snapshot() (first-seen key order)
//!     → extractor.rs
//!         FILE:   key=value lines → temp file → atomic rename
//!         REMOTE: /{env}/{app}/{version}/config/{key} nodes
//!     → ExtractionReport { written, skipped, failures }
//! ```
//!
//! # Design Decisions
//! - File writes are all-or-nothing
//! - Remote writes are per key; one failure does not stop the rest
//! - Extraction only adds or replaces, it never deletes

pub mod extractor;
pub mod target;

pub use extractor::{render_properties, ConfigExtractor, ExtractionError, ExtractionReport, KeyFailure};
pub use target::{ExtractionMode, ExtractionTarget};
