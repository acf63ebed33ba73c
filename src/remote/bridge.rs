//! Remote watch bridge.
//!
//! # Responsibilities
//! - Keep a session to the remote store rooted at the application's config path
//! - Feed the initial snapshot into the remote layer as one batch
//! - Translate node events into single-key updates
//! - Survive session loss: keep stale values, suppress events, then resync
//!
//! # Session States
//! ```text
//! Synced ──SessionLost──▶ Suspended (node events ignored, values kept)
//! Suspended ──SessionConnected──▶ resync snapshot (diff) ──▶ Synced
//! stream closed / never connected ──▶ re-establish with backoff ──▶ Synced
//! ```

use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::composite::{Configuration, LayerKind};
use crate::lifecycle::shutdown::{Shutdown, ShutdownListener};
use crate::remote::path::RemotePath;
use crate::remote::store::{RemoteError, RemoteStore, StoreEvent, Watch};
use crate::resilience::backoff::Backoff;

/// Snapshot reads attempted before events racing the read are replayed instead.
const SETTLE_READS: usize = 8;

/// The remote store could not be reached and the descriptor requires it.
#[derive(Debug, Error)]
#[error("Failed to connect to remote store at {root}: {source}")]
pub struct RemoteConnectionError {
    pub root: String,
    #[source]
    pub source: RemoteError,
}

/// Bridge tuning.
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// Fail `start` instead of retrying in the background.
    pub required: bool,
    pub reconnect_base_ms: u64,
    pub reconnect_max_ms: u64,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            required: false,
            reconnect_base_ms: 100,
            reconnect_max_ms: 10_000,
        }
    }
}

/// Running bridge task.
#[derive(Debug)]
pub struct BridgeHandle {
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

impl BridgeHandle {
    /// Stop the background task and wait for it to exit.
    pub async fn stop(self) {
        self.shutdown.trigger();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Remote watch bridge task failed");
        }
    }
}

/// Bridges a remote subtree into the remote layer of a [`Configuration`].
pub struct RemoteWatchBridge {
    store: Arc<dyn RemoteStore>,
    path: RemotePath,
    config: Configuration,
    options: BridgeOptions,
}

impl RemoteWatchBridge {
    pub fn new(store: Arc<dyn RemoteStore>, path: RemotePath, config: Configuration, options: BridgeOptions) -> Self {
        Self {
            store,
            path,
            config,
            options,
        }
    }

    /// Connect, apply the initial snapshot, then keep watching in the background.
    ///
    /// When the first connection fails and the remote layer is optional, the
    /// layer starts empty and the background task keeps retrying.
    pub async fn start(self) -> Result<BridgeHandle, RemoteConnectionError> {
        let root = self.path.root();
        let initial = match self.establish().await {
            Ok(watch) => Some(watch),
            Err(source) if self.options.required => {
                return Err(RemoteConnectionError { root, source });
            }
            Err(e) => {
                tracing::warn!(
                    root = %root,
                    error = %e,
                    "Remote store unavailable, starting with an empty remote layer"
                );
                None
            }
        };

        let shutdown = Shutdown::new();
        let listener = shutdown.subscribe();
        let task = tokio::spawn(self.run(initial, listener));
        Ok(BridgeHandle { shutdown, task })
    }

    async fn establish(&self) -> Result<Watch, RemoteError> {
        // Subscribe before reading so nothing between the two is missed.
        let mut watch = self.store.watch(&self.path.root()).await?;
        self.resync(&mut watch).await?;
        Ok(watch)
    }

    async fn resync(&self, watch: &mut Watch) -> Result<(), RemoteError> {
        let root = self.path.root();
        let children = match self.read_settled(watch).await? {
            Some(children) => children,
            None => {
                tracing::info!(root = %root, "Remote config root absent, remote layer is empty");
                Vec::new()
            }
        };
        let total = children.len();
        let events = self
            .config
            .replace_layer(LayerKind::Remote, children, Some(SystemTime::now()));
        tracing::info!(root = %root, keys = total, changed = events.len(), "Remote snapshot applied");
        Ok(())
    }

    /// Read the subtree until no node event is queued behind the read.
    ///
    /// Buffered node events describe writes the read may already include, so
    /// they are discarded and the subtree read again rather than replayed on
    /// top of a newer snapshot.
    async fn read_settled(&self, watch: &mut Watch) -> Result<Option<Vec<(String, String)>>, RemoteError> {
        let root = self.path.root();
        for attempt in 1..=SETTLE_READS {
            let children = self.store.read_children(&root).await?;
            let raced = discard_buffered(watch)?;
            if raced == 0 {
                return Ok(children);
            }
            tracing::debug!(root = %root, attempt, raced, "Node events raced the snapshot, reading again");
        }

        // Still churning: whatever arrives from here on is applied on top.
        tracing::warn!(root = %root, reads = SETTLE_READS, "Remote subtree kept changing during resync");
        self.store.read_children(&root).await
    }

    fn apply(&self, event: StoreEvent) {
        let root = self.path.root();
        match event {
            StoreEvent::NodeChanged { path, value } => {
                if let Some(key) = self.path.key_of(&path) {
                    self.config.set(LayerKind::Remote, key, value);
                    self.config.touch_layer(LayerKind::Remote, SystemTime::now());
                }
            }
            StoreEvent::NodeDeleted { path } if path == root => {
                tracing::info!(root = %root, "Remote config root deleted");
                self.config
                    .replace_layer(LayerKind::Remote, Vec::<(String, String)>::new(), Some(SystemTime::now()));
            }
            StoreEvent::NodeDeleted { path } => {
                if let Some(key) = self.path.key_of(&path) {
                    self.config.remove(LayerKind::Remote, key);
                    self.config.touch_layer(LayerKind::Remote, SystemTime::now());
                }
            }
            StoreEvent::SessionConnected | StoreEvent::SessionLost => {}
        }
    }

    async fn run(self, initial: Option<Watch>, mut shutdown: ShutdownListener) {
        let root = self.path.root();
        let mut backoff = Backoff::new(self.options.reconnect_base_ms, self.options.reconnect_max_ms);
        let mut synced = initial.is_some();
        let mut session_up = initial.is_some();
        let mut watch = initial;

        loop {
            let Some(stream) = watch.as_mut() else {
                let delay = backoff.next_delay();
                tokio::select! {
                    _ = shutdown.wait() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                match self.establish().await {
                    Ok(established) => {
                        tracing::info!(root = %root, attempts = backoff.attempt(), "Remote session established");
                        backoff.reset();
                        watch = Some(established);
                        synced = true;
                        session_up = true;
                    }
                    Err(e) => {
                        tracing::warn!(root = %root, attempt = backoff.attempt(), error = %e, "Remote reconnect failed");
                    }
                }
                continue;
            };

            let retry_resync = session_up && !synced;
            let retry_delay = if retry_resync {
                backoff.next_delay()
            } else {
                std::time::Duration::ZERO
            };

            tokio::select! {
                _ = shutdown.wait() => break,
                _ = tokio::time::sleep(retry_delay), if retry_resync => {
                    match self.resync(stream).await {
                        Ok(()) => {
                            backoff.reset();
                            synced = true;
                        }
                        Err(RemoteError::ConnectionLoss) => {
                            tracing::warn!(root = %root, "Remote session lost during resync");
                            session_up = false;
                        }
                        Err(e) => tracing::warn!(root = %root, error = %e, "Remote resync failed"),
                    }
                }
                event = stream.next() => match event {
                    None => {
                        tracing::warn!(root = %root, "Remote watch stream closed, reconnecting");
                        watch = None;
                        synced = false;
                        session_up = false;
                    }
                    Some(StoreEvent::SessionLost) => {
                        tracing::warn!(root = %root, "Remote session lost, keeping stale values and suppressing changes");
                        session_up = false;
                        synced = false;
                    }
                    Some(StoreEvent::SessionConnected) => {
                        session_up = true;
                        if !synced {
                            match self.resync(stream).await {
                                Ok(()) => {
                                    tracing::info!(root = %root, "Remote session restored");
                                    backoff.reset();
                                    synced = true;
                                }
                                Err(RemoteError::ConnectionLoss) => {
                                    tracing::warn!(root = %root, "Remote session lost during resync");
                                    session_up = false;
                                }
                                Err(e) => tracing::warn!(root = %root, error = %e, "Remote resync failed"),
                            }
                        }
                    }
                    Some(node_event) if synced => self.apply(node_event),
                    Some(node_event) => {
                        tracing::debug!(root = %root, event = ?node_event, "Ignoring node event while unsynced");
                    }
                },
            }
        }

        tracing::info!(root = %root, "Remote watch bridge stopped");
    }
}

/// Drop buffered events, counting the node events among them.
///
/// A buffered `SessionLost` invalidates the read in progress.
fn discard_buffered(watch: &mut Watch) -> Result<usize, RemoteError> {
    let mut nodes = 0;
    while let Some(event) = watch.try_next() {
        match event {
            StoreEvent::SessionLost => return Err(RemoteError::ConnectionLoss),
            StoreEvent::SessionConnected => {}
            StoreEvent::NodeChanged { .. } | StoreEvent::NodeDeleted { .. } => nodes += 1,
        }
    }
    Ok(nodes)
}
