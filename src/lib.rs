//! Application bootstrap library.
//!
//! Resolves a declared application entry point, assembles its layered
//! configuration (arguments, overrides, live remote tree, local properties,
//! bundled defaults), drives it through startup and shutdown, and can
//! extract the assembled configuration to a file or the remote store.

pub mod assembly;
pub mod composite;
pub mod config;
pub mod descriptor;
pub mod extract;
pub mod launcher;
pub mod lifecycle;
pub mod observability;
pub mod remote;
pub mod resilience;
pub mod sources;

pub use composite::{ChangeEvent, Configuration, LayerKind};
pub use config::BootstrapConfig;
pub use descriptor::{AppDescriptor, AppMeta, AppRegistry, EntryType, Marker};
pub use lifecycle::{Lifecycle, LifecycleState, Shutdown};
