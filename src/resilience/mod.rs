//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Remote session lost / connect failed:
//!     → backoff.rs (exponential delay with jitter, capped)
//!     → retry establish / resync
//!     → success resets the attempt counter
//! ```

pub mod backoff;

pub use backoff::{calculate_backoff, Backoff};
