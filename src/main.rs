//! Application bootstrap launcher.
//!
//! # Architecture Overview
//!
//! ```text
//!   CLI flags + bootstrap.toml
//!            │
//!            ▼
//!   ┌─────────────────┐     ┌──────────────────────────────────────────────┐
//!   │    launcher     │────▶│                 lifecycle                    │
//!   └─────────────────┘     │  descriptor ─▶ assembly ─▶ hooks ─▶ container │
//!            │              └──────────────────────┬───────────────────────┘
//!            │ extract                             │
//!            ▼                                     ▼
//!   ┌─────────────────┐     ┌──────────────────────────────────────────────┐
//!   │     extract     │◀────│      composite configuration (5 layers)       │
//!   └─────────────────┘     │  args │ overrides │ remote │ local │ defaults │
//!                           └───────────────────────▲──────────────────────┘
//!                                                   │ live updates
//!                                      ┌────────────┴────────────┐
//!                                      │  remote watch bridge    │
//!                                      │  (memory: / file:// )   │
//!                                      └─────────────────────────┘
//! ```
//!
//! The binary registers a small demonstration application; embedders build
//! their own [`AppRegistry`] and call [`Launcher::execute`].

use clap::Parser;
use std::process::ExitCode;

use app_bootstrap::descriptor::{AppMeta, AppRegistry, EntryType, Marker};
use app_bootstrap::launcher::{Cli, Launcher};

fn demo_registry() -> AppRegistry {
    let mut registry = AppRegistry::new();
    registry
        .register(
            EntryType::new("demo::Web").on_start(|config| {
                tracing::info!(port = %config.get_or("server.port", "8080"), "Demo web entry point ready");
                Ok(())
            }),
        )
        .register(
            EntryType::new("demo::Service")
                .marker(Marker::application(
                    AppMeta::new("demo-service").entry_point("demo::Web"),
                ))
                .on_init(|config| {
                    let grace = config.get_u64("server.shutdown_grace_secs")?;
                    tracing::info!(shutdown_grace_secs = ?grace, "Demo service initialized");
                    Ok(())
                })
                .on_stop(|_| {
                    tracing::info!("Demo service stopping");
                    Ok(())
                }),
        );
    registry
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let code = Launcher::new(demo_registry()).execute(cli).await;
    ExitCode::from(code)
}
