//! Remote configuration source.
//!
//! # Responsibilities
//! - Abstract the coordination service behind [`RemoteStore`]
//! - Map an application onto its node tree ([`RemotePath`])
//! - Bridge node events into the remote layer ([`RemoteWatchBridge`])
//!
//! # Data Flow
//! ```text
//! RemoteStore::watch(root) ──▶ StoreEvent stream ──▶ RemoteWatchBridge
//!                                                        │
//!          read_children(root) ──▶ snapshot ─────────────┤
//!                                                        ▼
//!                                    Configuration (remote layer)
//! ```
//!
//! # Endpoints
//! - `memory:` in-process store, shared by everything holding the same handle
//! - `file:///path` directory tree, watched with `notify`

pub mod bridge;
pub mod fs;
pub mod memory;
pub mod path;
pub mod store;

pub use bridge::{BridgeHandle, BridgeOptions, RemoteConnectionError, RemoteWatchBridge};
pub use fs::FsStore;
pub use memory::MemoryStore;
pub use path::RemotePath;
pub use store::{RemoteError, RemoteStore, StoreEvent, Watch};

use std::sync::Arc;

/// Open the store named by a `memory:` or `file:` endpoint.
pub fn open_store(endpoint: &str) -> Result<Arc<dyn RemoteStore>, RemoteError> {
    let endpoint = endpoint.trim();
    if endpoint == "memory:" {
        return Ok(Arc::new(MemoryStore::new()));
    }

    let parsed = url::Url::parse(endpoint).map_err(|_| RemoteError::UnsupportedEndpoint(endpoint.to_string()))?;
    match parsed.scheme() {
        "file" => {
            let base = parsed
                .to_file_path()
                .map_err(|_| RemoteError::UnsupportedEndpoint(endpoint.to_string()))?;
            tracing::info!(base = %base.display(), "Using filesystem remote store");
            Ok(Arc::new(FsStore::new(base)))
        }
        _ => Err(RemoteError::UnsupportedEndpoint(endpoint.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_store_endpoints() {
        assert!(open_store("memory:").is_ok());
        assert!(open_store("file:///tmp/app-bootstrap-remote").is_ok());
        assert!(matches!(
            open_store("zk://localhost:2181"),
            Err(RemoteError::UnsupportedEndpoint(_))
        ));
        assert!(matches!(open_store("not a url"), Err(RemoteError::UnsupportedEndpoint(_))));
    }
}
