//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (controller.rs):
//!     Resolve descriptor → Assemble configuration → Init hooks
//!     → Container start → Start hooks → RUNNING
//!
//! Shutdown (controller.rs):
//!     stop() → Container stop → Stop hooks → Destroy hooks
//!     → Remote bridge stop (shutdown.rs) → STOPPED
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → stop()
//! ```
//!
//! # Design Decisions
//! - Ordered startup: descriptor first, then configuration, then container
//! - Startup hooks are strict, shutdown hooks are best-effort
//! - Shutdown has no deadline; callers needing one wrap `stop()` themselves

pub mod container;
pub mod controller;
pub mod hooks;
pub mod shutdown;
pub mod signals;

pub use container::{Container, ContainerError, NoContainer};
pub use controller::{Lifecycle, LifecycleBuilder, LifecycleError, LifecycleState};
pub use hooks::{Hook, HookError, HookInvocationError, HookPhase, HookResult, HookSet};
pub use shutdown::{Shutdown, ShutdownListener};
pub use signals::wait_for_signal;
