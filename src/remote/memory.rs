//! In-process remote store.
//!
//! Behaves like a coordination service with one shared session: writes are
//! visible immediately, watchers receive node events while the session is
//! up, and events that happen while it is down are lost. Session loss and
//! connection refusal can be injected.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::remote::store::{RemoteError, RemoteStore, StoreEvent, Watch};

struct Watcher {
    root: String,
    tx: mpsc::UnboundedSender<StoreEvent>,
}

struct MemoryInner {
    nodes: DashMap<String, String>,
    watchers: Mutex<Vec<Watcher>>,
    connected: AtomicBool,
    refusing: AtomicBool,
}

/// Shared in-memory store. Clones address the same tree.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn parent_of(path: &str) -> Option<&str> {
    match path.rfind('/') {
        Some(0) | None => None,
        Some(pos) => Some(&path[..pos]),
    }
}

fn check_path(path: &str) -> Result<(), RemoteError> {
    if !path.starts_with('/') || path.len() < 2 || path.ends_with('/') || path.contains("//") {
        return Err(RemoteError::InvalidPath(path.to_string()));
    }
    Ok(())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                nodes: DashMap::new(),
                watchers: Mutex::new(Vec::new()),
                connected: AtomicBool::new(true),
                refusing: AtomicBool::new(false),
            }),
        }
    }

    fn ensure_session(&self) -> Result<(), RemoteError> {
        if self.inner.refusing.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("connection refused".to_string()));
        }
        if !self.inner.connected.load(Ordering::SeqCst) {
            return Err(RemoteError::ConnectionLoss);
        }
        Ok(())
    }

    fn ensure_parents(&self, path: &str) {
        let mut current = parent_of(path);
        while let Some(parent) = current {
            self.inner.nodes.entry(parent.to_string()).or_default();
            current = parent_of(parent);
        }
    }

    fn broadcast(&self, event: StoreEvent) {
        let path = match &event {
            StoreEvent::NodeChanged { path, .. } | StoreEvent::NodeDeleted { path } => Some(path.clone()),
            _ => None,
        };
        let connected = self.inner.connected.load(Ordering::SeqCst);
        if path.is_some() && !connected {
            return;
        }

        let mut watchers = self.inner.watchers.lock().unwrap_or_else(|e| e.into_inner());
        watchers.retain(|w| {
            let relevant = match &path {
                Some(p) => p == &w.root || p.starts_with(&format!("{}/", w.root)),
                None => true,
            };
            !relevant || w.tx.send(event.clone()).is_ok()
        });
    }

    /// Write a node as an external writer would, notifying watchers.
    pub fn put(&self, path: &str, value: &str) {
        self.ensure_parents(path);
        self.inner.nodes.insert(path.to_string(), value.to_string());
        self.broadcast(StoreEvent::NodeChanged {
            path: path.to_string(),
            value: value.to_string(),
        });
    }

    /// Delete a node and everything below it, notifying watchers.
    pub fn delete(&self, path: &str) {
        let prefix = format!("{}/", path);
        let mut doomed: Vec<String> = self
            .inner
            .nodes
            .iter()
            .filter(|e| e.key() == path || e.key().starts_with(&prefix))
            .map(|e| e.key().clone())
            .collect();
        // Deepest first, so children are reported before their parent.
        doomed.sort_by_key(|p| std::cmp::Reverse(p.len()));
        for node in doomed {
            self.inner.nodes.remove(&node);
            self.broadcast(StoreEvent::NodeDeleted { path: node });
        }
    }

    /// Current value of a node, ignoring session state.
    pub fn value(&self, path: &str) -> Option<String> {
        self.inner.nodes.get(path).map(|v| v.value().clone())
    }

    /// Drop the session: watchers get `SessionLost` and operations fail.
    pub fn disconnect(&self) {
        self.inner.connected.store(false, Ordering::SeqCst);
        self.broadcast(StoreEvent::SessionLost);
    }

    /// Restore the session: watchers get `SessionConnected`.
    pub fn reconnect(&self) {
        self.inner.connected.store(true, Ordering::SeqCst);
        self.broadcast(StoreEvent::SessionConnected);
    }

    /// Refuse new connections and operations until cleared.
    pub fn refuse_connections(&self, refuse: bool) {
        self.inner.refusing.store(refuse, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn exists(&self, path: &str) -> Result<bool, RemoteError> {
        self.ensure_session()?;
        Ok(self.inner.nodes.contains_key(path))
    }

    async fn read_children(&self, path: &str) -> Result<Option<Vec<(String, String)>>, RemoteError> {
        self.ensure_session()?;
        if !self.inner.nodes.contains_key(path) {
            return Ok(None);
        }
        let mut children: Vec<(String, String)> = self
            .inner
            .nodes
            .iter()
            .filter(|e| parent_of(e.key()) == Some(path))
            .map(|e| (e.key()[path.len() + 1..].to_string(), e.value().clone()))
            .collect();
        children.sort();
        Ok(Some(children))
    }

    async fn create(&self, path: &str, value: &str) -> Result<bool, RemoteError> {
        self.ensure_session()?;
        check_path(path)?;
        let created = match self.inner.nodes.entry(path.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value.to_string());
                true
            }
        };
        if created {
            self.ensure_parents(path);
            self.broadcast(StoreEvent::NodeChanged {
                path: path.to_string(),
                value: value.to_string(),
            });
        }
        Ok(created)
    }

    async fn set(&self, path: &str, value: &str) -> Result<(), RemoteError> {
        self.ensure_session()?;
        check_path(path)?;
        self.put(path, value);
        Ok(())
    }

    async fn watch(&self, root: &str) -> Result<Watch, RemoteError> {
        self.ensure_session()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(StoreEvent::SessionConnected);
        self.inner
            .watchers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Watcher {
                root: root.to_string(),
                tx,
            });
        Ok(Watch::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_is_first_writer_wins() {
        let store = MemoryStore::new();
        assert!(store.create("/dev/app/1/config/a", "first").await.unwrap());
        assert!(!store.create("/dev/app/1/config/a", "second").await.unwrap());
        assert_eq!(store.value("/dev/app/1/config/a").as_deref(), Some("first"));
        assert!(store.exists("/dev/app/1/config").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_children_direct_only() {
        let store = MemoryStore::new();
        store.put("/r/a", "1");
        store.put("/r/b", "2");
        store.put("/r/b/c", "3");
        let children = store.read_children("/r").await.unwrap().unwrap();
        assert_eq!(children, vec![("a".into(), "1".into()), ("b".into(), "2".into())]);
        assert!(store.read_children("/missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_watch_and_session_events() {
        let store = MemoryStore::new();
        let mut watch = store.watch("/r").await.unwrap();
        assert_eq!(watch.next().await, Some(StoreEvent::SessionConnected));

        store.put("/r/a", "1");
        store.put("/elsewhere", "x");
        assert_eq!(
            watch.next().await,
            Some(StoreEvent::NodeChanged {
                path: "/r/a".into(),
                value: "1".into()
            })
        );

        store.disconnect();
        assert_eq!(watch.next().await, Some(StoreEvent::SessionLost));
        assert!(store.exists("/r").await.is_err());
        store.put("/r/b", "lost");
        store.reconnect();
        assert_eq!(watch.next().await, Some(StoreEvent::SessionConnected));
        assert_eq!(store.value("/r/b").as_deref(), Some("lost"));
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let store = MemoryStore::new();
        store.refuse_connections(true);
        assert!(matches!(store.watch("/r").await, Err(RemoteError::Unavailable(_))));
    }
}
