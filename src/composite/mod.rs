//! Composite configuration subsystem.
//!
//! # Data Flow
//! ```text
//! arguments ─┐
//! overrides ─┤
//! remote ────┼─▶ configuration.rs (precedence merge) ─▶ get / snapshot
//! local ─────┤                  │
//! defaults ──┘                  └─▶ events.rs (ChangeEvent to subscribers)
//! ```
//!
//! # Design Decisions
//! - Precedence is fixed and total; a higher layer always wins
//! - An update shadowed by a higher layer is invisible to readers and subscribers
//! - Absent keys are not errors; typed parse failures are

pub mod configuration;
pub mod events;
pub mod layer;
pub mod typed;

pub use configuration::{Configuration, Snapshot};
pub use events::{ChangeEvent, SubscriptionId};
pub use layer::{Layer, LayerKind};
pub use typed::ConfigTypeError;
