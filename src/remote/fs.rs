//! Filesystem-backed remote store.
//!
//! Maps the node tree onto a directory: interior nodes are directories,
//! valued nodes are files holding the value. Several processes sharing the
//! directory (for example over a network mount) see each other's writes,
//! and `notify` delivers the node events. Names starting with `.` are
//! reserved for temporary files and never surface as nodes.

use async_trait::async_trait;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::remote::store::{RemoteError, RemoteStore, StoreEvent, Watch};

/// Store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    base: PathBuf,
}

fn io_error(path: &str, source: std::io::Error) -> RemoteError {
    RemoteError::Io {
        path: path.to_string(),
        source,
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Hidden sibling of `file` used to stage a write.
fn staging_path(file: &Path, suffix: &str) -> PathBuf {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    file.with_file_name(format!(".{}.{}", name, suffix))
}

impl FsStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn node_path(&self, path: &str) -> Result<PathBuf, RemoteError> {
        let rel = path
            .strip_prefix('/')
            .ok_or_else(|| RemoteError::InvalidPath(path.to_string()))?;
        let mut resolved = self.base.clone();
        for segment in rel.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." || is_hidden(segment) {
                return Err(RemoteError::InvalidPath(path.to_string()));
            }
            resolved.push(segment);
        }
        Ok(resolved)
    }

    async fn ensure_parent(&self, path: &str, file: &Path) -> Result<(), RemoteError> {
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| io_error(path, e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for FsStore {
    async fn exists(&self, path: &str) -> Result<bool, RemoteError> {
        let file = self.node_path(path)?;
        match tokio::fs::metadata(&file).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(path, e)),
        }
    }

    async fn read_children(&self, path: &str) -> Result<Option<Vec<(String, String)>>, RemoteError> {
        let dir = self.node_path(path)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            // A valued leaf has no children.
            Err(_) if dir.is_file() => return Ok(Some(Vec::new())),
            Err(e) => return Err(io_error(path, e)),
        };

        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(path, e))? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_hidden(&name) {
                continue;
            }
            let file_type = entry.file_type().await.map_err(|e| io_error(path, e))?;
            if !file_type.is_file() {
                continue;
            }
            match tokio::fs::read_to_string(entry.path()).await {
                Ok(value) => children.push((name, value)),
                // Deleted between listing and reading.
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(io_error(path, e)),
            }
        }
        children.sort();
        Ok(Some(children))
    }

    async fn create(&self, path: &str, value: &str) -> Result<bool, RemoteError> {
        let file = self.node_path(path)?;
        self.ensure_parent(path, &file).await?;

        // Stage the full value, then link it into place: linking fails when the
        // node exists, and watchers never see it half written.
        let staging = staging_path(&file, &format!("{:016x}.new", rand::random::<u64>()));
        tokio::fs::write(&staging, value).await.map_err(|e| io_error(path, e))?;
        let linked = tokio::fs::hard_link(&staging, &file).await;
        if let Err(e) = tokio::fs::remove_file(&staging).await {
            tracing::debug!(path = %staging.display(), error = %e, "Failed to remove staging file");
        }
        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(io_error(path, e)),
        }
    }

    async fn set(&self, path: &str, value: &str) -> Result<(), RemoteError> {
        let file = self.node_path(path)?;
        self.ensure_parent(path, &file).await?;

        // Write beside the node, then rename over it so readers never see a partial value.
        let staging = staging_path(&file, "tmp");
        tokio::fs::write(&staging, value).await.map_err(|e| io_error(path, e))?;
        tokio::fs::rename(&staging, &file).await.map_err(|e| io_error(path, e))?;
        Ok(())
    }

    async fn watch(&self, root: &str) -> Result<Watch, RemoteError> {
        let root_dir = self.node_path(root)?;
        tokio::fs::create_dir_all(&self.base)
            .await
            .map_err(|e| io_error("/", e))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(StoreEvent::SessionConnected);

        let root_path = root.to_string();
        let events_tx = tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Access(_)) {
                        return;
                    }
                    for path in &event.paths {
                        if path.parent() != Some(root_dir.as_path()) {
                            continue;
                        }
                        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                            continue;
                        };
                        if is_hidden(&name) {
                            continue;
                        }
                        let node = format!("{}/{}", root_path, name);
                        let translated = match std::fs::read_to_string(path) {
                            Ok(value) => StoreEvent::NodeChanged { path: node, value },
                            Err(e) if e.kind() == ErrorKind::NotFound => StoreEvent::NodeDeleted { path: node },
                            Err(e) => {
                                tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable node");
                                continue;
                            }
                        };
                        let _ = events_tx.send(translated);
                    }
                }
                Err(e) => tracing::error!("Remote store watch error: {:?}", e),
            },
            Config::default(),
        )
        .map_err(|e| RemoteError::Watch(e.to_string()))?;

        watcher
            .watch(&self.base, RecursiveMode::Recursive)
            .map_err(|e| RemoteError::Watch(e.to_string()))?;

        tracing::info!(base = %self.base.display(), root = %root, "Filesystem store watch started");
        Ok(Watch::with_guard(rx, (watcher, tx)))
    }
}
