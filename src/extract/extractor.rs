//! Configuration extraction.
//!
//! # Responsibilities
//! - Write the assembled snapshot as escaped `key=value` lines, replacing the file atomically
//! - Publish the snapshot as one node per key under the remote base path
//! - Never delete remote keys that are absent from the snapshot
//!
//! # Remote Write Policy
//! ```text
//! overwrite=false: create-if-absent per key; existing (or concurrently created) keys are skipped
//! overwrite=true:  create-if-absent per key; a key that already exists is replaced
//! ```

use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::assembly::remote_path_for;
use crate::composite::{Configuration, Snapshot};
use crate::config::BootstrapConfig;
use crate::descriptor::AppDescriptor;
use crate::extract::target::{ExtractionMode, ExtractionTarget};
use crate::remote::{RemoteError, RemoteStore};
use crate::sources::properties::{escape_key, escape_value};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Extraction target for mode '{0}' needs a path")]
    MissingPath(ExtractionMode),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Remote extraction requested but no remote store is configured")]
    NoRemoteStore,

    #[error("Remote base path unusable: {0}")]
    Remote(#[from] RemoteError),
}

/// A key that could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyFailure {
    pub key: String,
    pub error: String,
}

/// Outcome of one extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionReport {
    pub written: usize,
    pub skipped: usize,
    pub failures: Vec<KeyFailure>,
}

impl ExtractionReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Render a snapshot as flat `key=value` lines, one line per key.
pub fn render_properties(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for (key, value) in snapshot.iter() {
        out.push_str(&escape_key(key));
        out.push('=');
        out.push_str(&escape_value(value));
        out.push('\n');
    }
    out
}

/// Writes assembled configuration to a file or the remote store.
pub struct ConfigExtractor<'a> {
    settings: &'a BootstrapConfig,
    store: Option<Arc<dyn RemoteStore>>,
}

impl<'a> ConfigExtractor<'a> {
    pub fn new(settings: &'a BootstrapConfig, store: Option<Arc<dyn RemoteStore>>) -> Self {
        Self { settings, store }
    }

    pub async fn extract(
        &self,
        descriptor: &AppDescriptor,
        config: &Configuration,
        target: &ExtractionTarget,
    ) -> Result<ExtractionReport, ExtractionError> {
        let snapshot = config.snapshot();
        let report = match target.mode {
            ExtractionMode::File => {
                let path = target
                    .path
                    .as_deref()
                    .ok_or(ExtractionError::MissingPath(ExtractionMode::File))?;
                write_file(Path::new(path), &snapshot)?
            }
            ExtractionMode::Remote => self.write_remote(descriptor, &snapshot, target).await?,
        };

        tracing::info!(
            app = %descriptor.name,
            mode = %target.mode,
            written = report.written,
            skipped = report.skipped,
            failed = report.failures.len(),
            "Extraction finished"
        );
        Ok(report)
    }

    async fn write_remote(
        &self,
        descriptor: &AppDescriptor,
        snapshot: &Snapshot,
        target: &ExtractionTarget,
    ) -> Result<ExtractionReport, ExtractionError> {
        let store = self.store.as_ref().ok_or(ExtractionError::NoRemoteStore)?;
        let remote_path = remote_path_for(self.settings, descriptor)?;
        let base = remote_path.root();

        if store.exists(&base).await? {
            tracing::debug!(base = %base, overwrite = target.overwrite, "Remote base exists");
        } else {
            tracing::info!(base = %base, "Remote base absent, creating every key");
        }

        let mut report = ExtractionReport::default();
        for (key, value) in snapshot.iter() {
            let node = match remote_path.key_path(key) {
                Ok(node) => node,
                Err(e) => {
                    report.failures.push(KeyFailure {
                        key: key.to_string(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            match put_node(&**store, &node, value, target.overwrite).await {
                Ok(true) => report.written += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    tracing::warn!(node = %node, error = %e, "Failed to write remote key");
                    report.failures.push(KeyFailure {
                        key: key.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }
}

/// Returns whether the node now holds `value` because of this call.
async fn put_node(store: &dyn RemoteStore, node: &str, value: &str, overwrite: bool) -> Result<bool, RemoteError> {
    if store.create(node, value).await? {
        return Ok(true);
    }
    if overwrite {
        store.set(node, value).await?;
        return Ok(true);
    }
    Ok(false)
}

/// Replace `path` with the rendered snapshot; nothing is written on failure.
fn write_file(path: &Path, snapshot: &Snapshot) -> Result<ExtractionReport, ExtractionError> {
    let write_error = |source| ExtractionError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(write_error)?;
    staged
        .write_all(render_properties(snapshot).as_bytes())
        .map_err(write_error)?;
    staged.flush().map_err(write_error)?;
    staged.persist(path).map_err(|e| write_error(e.error))?;

    tracing::debug!(path = %path.display(), keys = snapshot.len(), "Properties file written");
    Ok(ExtractionReport {
        written: snapshot.len(),
        skipped: 0,
        failures: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::{Layer, LayerKind};
    use crate::remote::MemoryStore;

    fn descriptor() -> AppDescriptor {
        AppDescriptor {
            type_name: "Main".into(),
            name: "orders".into(),
            properties_location: None,
            requires_container: false,
            container_entry_points: Vec::new(),
            remote_required: false,
            version: None,
        }
    }

    fn config(entries: &[(&str, &str)]) -> Configuration {
        let layer = Layer::from_entries(entries.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        Configuration::from_layers([(LayerKind::Local, layer)])
    }

    #[test]
    fn test_render_properties_in_snapshot_order() {
        let rendered = render_properties(&config(&[("b", "2"), ("a", "1")]).snapshot());
        assert_eq!(rendered, "b=2\na=1\n");
    }

    #[test]
    fn test_render_properties_keeps_one_line_per_key() {
        let rendered = render_properties(&config(&[("motd", "hello\ninjected=1"), ("a=b", "c")]).snapshot());
        assert_eq!(rendered, "motd=hello\\ninjected=1\na\\=b=c\n");
    }

    #[tokio::test]
    async fn test_file_without_path_is_rejected() {
        let settings = BootstrapConfig::default();
        let target = ExtractionTarget {
            mode: ExtractionMode::File,
            path: None,
            overwrite: true,
        };
        let err = ConfigExtractor::new(&settings, None)
            .extract(&descriptor(), &config(&[]), &target)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::MissingPath(ExtractionMode::File)));
    }

    #[tokio::test]
    async fn test_unwritable_file_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = ExtractionTarget::file(dir.path().join("missing/dir/out.properties").display().to_string());
        let settings = BootstrapConfig::default();
        let err = ConfigExtractor::new(&settings, None)
            .extract(&descriptor(), &config(&[("a", "1")]), &target)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Write { .. }));
    }

    #[tokio::test]
    async fn test_remote_creates_missing_keys_without_overwrite() {
        let store = MemoryStore::new();
        store.put("/dev/orders/1.0/config/a", "old");
        let settings = BootstrapConfig::default();
        let extractor = ConfigExtractor::new(&settings, Some(Arc::new(store.clone())));

        let report = extractor
            .extract(&descriptor(), &config(&[("a", "new"), ("b", "2")]), &ExtractionTarget::remote(false))
            .await
            .unwrap();
        assert_eq!(report.written, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(store.value("/dev/orders/1.0/config/a").as_deref(), Some("old"));
        assert_eq!(store.value("/dev/orders/1.0/config/b").as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_remote_key_failure_does_not_block_others() {
        let store = MemoryStore::new();
        let settings = BootstrapConfig::default();
        let extractor = ConfigExtractor::new(&settings, Some(Arc::new(store.clone())));

        let report = extractor
            .extract(
                &descriptor(),
                &config(&[("x/y", "1"), ("..", "3"), ("ok", "2")]),
                &ExtractionTarget::remote(true),
            )
            .await
            .unwrap();
        assert_eq!(report.written, 1);
        let failed: Vec<&str> = report.failures.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(failed, vec!["x/y", ".."]);
        assert_eq!(store.value("/dev/orders/1.0/config/ok").as_deref(), Some("2"));
        assert_eq!(store.value("/dev/orders/1.0/config/.."), None);
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn test_remote_without_store() {
        let settings = BootstrapConfig::default();
        let err = ConfigExtractor::new(&settings, None)
            .extract(&descriptor(), &config(&[]), &ExtractionTarget::remote(false))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::NoRemoteStore));
    }
}
