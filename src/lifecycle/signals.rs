//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT (Ctrl-C) or SIGTERM
//! - Translate the first signal into a lifecycle stop
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A lifecycle that reaches a terminal state on its own ends the wait too

use crate::lifecycle::controller::{Lifecycle, LifecycleState};

/// Resolve when the process receives SIGINT or SIGTERM, naming the signal.
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT"),
            _ = terminate.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.map(|_| "SIGINT")
    }
}

impl Lifecycle {
    /// Wait for a shutdown signal, then stop. Returns the final state.
    ///
    /// Call after a successful `start()`.
    pub async fn run_until_signal(&self) -> LifecycleState {
        tokio::select! {
            signal = wait_for_signal() => {
                match signal {
                    Ok(name) => tracing::info!(signal = name, "Shutdown signal received"),
                    Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signals, stopping"),
                }
                self.stop().await
            }
            state = self.wait_for_terminal() => state,
        }
    }
}
