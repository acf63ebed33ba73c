//! Remote store interface.
//!
//! The distributed coordination service is reached through [`RemoteStore`].
//! Nodes are addressed by absolute `/`-separated paths and hold string values.

use async_trait::async_trait;
use std::any::Any;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors returned by remote store operations.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    #[error("Remote session lost")]
    ConnectionLoss,

    #[error("Invalid remote path '{0}'")]
    InvalidPath(String),

    #[error("Unsupported remote endpoint '{0}'")]
    UnsupportedEndpoint(String),

    #[error("Remote I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Remote watch failed: {0}")]
    Watch(String),
}

/// Session and node notifications for a watched subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    SessionConnected,
    SessionLost,
    NodeChanged { path: String, value: String },
    NodeDeleted { path: String },
}

/// A live stream of [`StoreEvent`]s.
///
/// The optional guard keeps implementation resources (such as a file
/// watcher) alive for as long as the stream is held.
pub struct Watch {
    events: mpsc::UnboundedReceiver<StoreEvent>,
    _guard: Option<Box<dyn Any + Send>>,
}

impl Watch {
    pub fn new(events: mpsc::UnboundedReceiver<StoreEvent>) -> Self {
        Self { events, _guard: None }
    }

    pub fn with_guard(events: mpsc::UnboundedReceiver<StoreEvent>, guard: impl Any + Send) -> Self {
        Self {
            events,
            _guard: Some(Box::new(guard)),
        }
    }

    /// Next event; `None` once the store closed the stream.
    pub async fn next(&mut self) -> Option<StoreEvent> {
        self.events.recv().await
    }

    /// Next already-buffered event, without waiting.
    pub fn try_next(&mut self) -> Option<StoreEvent> {
        self.events.try_recv().ok()
    }
}

impl std::fmt::Debug for Watch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watch").finish_non_exhaustive()
    }
}

/// Client of the distributed coordination service.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn exists(&self, path: &str) -> Result<bool, RemoteError>;

    /// `(name, value)` of every direct child, or `None` when `path` is absent.
    async fn read_children(&self, path: &str) -> Result<Option<Vec<(String, String)>>, RemoteError>;

    /// Create `path` if absent, creating missing parents.
    ///
    /// Returns `false` when the node already existed; the first writer wins.
    async fn create(&self, path: &str, value: &str) -> Result<bool, RemoteError>;

    /// Create or replace the value at `path`.
    async fn set(&self, path: &str, value: &str) -> Result<(), RemoteError>;

    /// Watch the subtree below `root`. The stream starts with `SessionConnected`.
    async fn watch(&self, root: &str) -> Result<Watch, RemoteError>;
}
