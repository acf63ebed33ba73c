//! Application descriptor subsystem.
//!
//! # Data Flow
//! ```text
//! application code
//!     → registry.rs (EntryType: markers + hooks)
//!     → resolver.rs (explicit name or full scan, stereotype delegation)
//!     → AppDescriptor (immutable, one per process)
//! ```
//!
//! # Design Decisions
//! - Entry points are registered explicitly; there is no ambient discovery
//! - Exactly one entry point must resolve, anything else is fatal
//! - Hooks travel with their type and are collected in declaration order

pub mod marker;
pub mod registry;
pub mod resolver;

pub use marker::{AppMeta, Marker};
pub use registry::{AppRegistry, EntryType};
pub use resolver::{DescriptorError, DescriptorResolver};

/// Resolved, immutable description of the application entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDescriptor {
    /// Registered name of the entry type.
    pub type_name: String,
    /// Application name (never empty).
    pub name: String,
    pub properties_location: Option<String>,
    pub requires_container: bool,
    /// Additional types contributing hooks, deduplicated, in declaration order.
    pub container_entry_points: Vec<String>,
    pub remote_required: bool,
    pub version: Option<String>,
}

impl AppDescriptor {
    /// Entry type followed by its container entry points.
    pub fn entry_types(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.type_name.as_str()).chain(self.container_entry_points.iter().map(String::as_str))
    }
}
