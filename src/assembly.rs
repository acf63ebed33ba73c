//! Configuration assembly.
//!
//! # Responsibilities
//! - Build the five layers for one resolved descriptor
//! - Start the remote watch bridge when a store is configured
//! - Resolve the local properties location against higher layers
//!
//! # Data Flow
//! ```text
//! process args ──────────────▶ Arguments ─┐
//! settings overrides ────────▶ Overrides ─┤
//! RemoteStore ──▶ bridge ────▶ Remote ────┤──▶ Configuration
//!         ${..} expansion ──┐             │
//! properties resource ──────┴▶ Local ─────┤
//! defaults.toml ─────────────▶ Defaults ──┘
//! ```
//!
//! Higher layers load first so the local location and its values can refer
//! to them through `${key}`.
//!
//! Local values are expanded once, when the resource is loaded. A later
//! remote update to a referenced key does not re-expand them and raises no
//! change event for the referring key until the next assembly.

use std::sync::Arc;
use thiserror::Error;

use crate::composite::{Configuration, Layer, LayerKind};
use crate::config::BootstrapConfig;
use crate::descriptor::AppDescriptor;
use crate::remote::{BridgeHandle, BridgeOptions, RemoteConnectionError, RemoteError, RemotePath, RemoteStore, RemoteWatchBridge};
use crate::sources::{bundled_defaults, expand, read_properties, PropertiesLocation, SourceError};

/// Layers consulted when expanding placeholders in the local resource.
const EXPANSION_LAYERS: [LayerKind; 3] = [LayerKind::Arguments, LayerKind::Overrides, LayerKind::Remote];

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Remote(#[from] RemoteConnectionError),

    #[error("Invalid remote path for application '{app}': {source}")]
    RemotePath {
        app: String,
        #[source]
        source: RemoteError,
    },

    #[error("Application '{0}' requires a remote store but no endpoint is configured")]
    RemoteNotConfigured(String),
}

/// An assembled configuration and the task keeping its remote layer live.
#[derive(Debug)]
pub struct Assembled {
    pub configuration: Configuration,
    pub bridge: Option<BridgeHandle>,
}

impl Assembled {
    /// Stop the remote bridge, if any. The configuration stays readable.
    pub async fn shutdown(self) -> Configuration {
        if let Some(bridge) = self.bridge {
            bridge.stop().await;
        }
        self.configuration
    }
}

/// Builds a [`Configuration`] for a descriptor.
pub struct ConfigAssembler<'a> {
    settings: &'a BootstrapConfig,
    arguments: Layer,
    store: Option<Arc<dyn RemoteStore>>,
}

impl<'a> ConfigAssembler<'a> {
    pub fn new(settings: &'a BootstrapConfig, arguments: Layer) -> Self {
        Self {
            settings,
            arguments,
            store: None,
        }
    }

    pub fn with_store(mut self, store: Option<Arc<dyn RemoteStore>>) -> Self {
        self.store = store;
        self
    }

    pub async fn assemble(mut self, descriptor: &AppDescriptor) -> Result<Assembled, AssemblyError> {
        let arguments = std::mem::take(&mut self.arguments);
        let overrides = self.settings.overrides_layer();
        let defaults = bundled_defaults()?;
        tracing::debug!(
            arguments = arguments.len(),
            overrides = overrides.len(),
            defaults = defaults.len(),
            "Static layers loaded"
        );

        let configuration = Configuration::from_layers([
            (LayerKind::Arguments, arguments),
            (LayerKind::Overrides, overrides),
            (LayerKind::Defaults, defaults),
        ]);

        let bridge = self.start_remote(descriptor, &configuration).await?;

        if let Err(e) = load_local(self.settings, descriptor, &configuration) {
            if let Some(bridge) = bridge {
                bridge.stop().await;
            }
            return Err(e);
        }

        tracing::info!(
            app = %descriptor.name,
            keys = configuration.snapshot().len(),
            remote = bridge.is_some(),
            "Configuration assembled"
        );
        Ok(Assembled { configuration, bridge })
    }

    async fn start_remote(
        &self,
        descriptor: &AppDescriptor,
        configuration: &Configuration,
    ) -> Result<Option<BridgeHandle>, AssemblyError> {
        let Some(store) = self.store.clone() else {
            if descriptor.remote_required {
                return Err(AssemblyError::RemoteNotConfigured(descriptor.name.clone()));
            }
            tracing::debug!(app = %descriptor.name, "No remote store configured");
            return Ok(None);
        };

        let path = remote_path_for(self.settings, descriptor).map_err(|source| AssemblyError::RemotePath {
            app: descriptor.name.clone(),
            source,
        })?;

        let options = BridgeOptions {
            required: descriptor.remote_required,
            reconnect_base_ms: self.settings.remote.reconnect_base_ms,
            reconnect_max_ms: self.settings.remote.reconnect_max_ms,
        };
        let handle = RemoteWatchBridge::new(store, path, configuration.clone(), options)
            .start()
            .await?;
        Ok(Some(handle))
    }
}

/// Remote tree of an application: the descriptor's version wins over the settings'.
pub fn remote_path_for(settings: &BootstrapConfig, descriptor: &AppDescriptor) -> Result<RemotePath, RemoteError> {
    let version = descriptor.version.as_deref().unwrap_or(&settings.version);
    RemotePath::new(&settings.environment, &descriptor.name, version)
}

fn load_local(
    settings: &BootstrapConfig,
    descriptor: &AppDescriptor,
    configuration: &Configuration,
) -> Result<(), AssemblyError> {
    let lookup = |key: &str| {
        EXPANSION_LAYERS
            .iter()
            .find_map(|layer| configuration.layer_value(*layer, key))
    };

    let declared = settings
        .local
        .properties
        .as_deref()
        .or(descriptor.properties_location.as_deref());
    let explicit = declared.is_some();
    let raw = match declared {
        Some(location) => location.to_string(),
        None => format!("classpath:{}.properties", descriptor.name),
    };

    let expanded = expand(&raw, lookup);
    let location = PropertiesLocation::parse(&expanded)?;
    let path = location.resolve(&settings.local.resource_root);

    let Some(layer) = read_properties(&path)? else {
        if explicit {
            tracing::warn!(location = %expanded, path = %path.display(), "Properties resource not found, local layer is empty");
        } else {
            tracing::debug!(path = %path.display(), "No default properties resource");
        }
        return Ok(());
    };

    // Expanded against the values as of now; see the module docs.
    let entries: Vec<(String, String)> = layer
        .iter()
        .map(|(key, value)| (key.to_string(), expand(value, lookup)))
        .collect();
    tracing::info!(path = %path.display(), keys = entries.len(), "Local properties loaded");
    configuration.replace_layer(LayerKind::Local, entries, layer.last_modified());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryStore;
    use crate::sources::read_arguments;

    fn descriptor(name: &str) -> AppDescriptor {
        AppDescriptor {
            type_name: "Main".into(),
            name: name.into(),
            properties_location: None,
            requires_container: false,
            container_entry_points: Vec::new(),
            remote_required: false,
            version: None,
        }
    }

    #[tokio::test]
    async fn test_default_location_and_precedence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("orders.properties"), "db.host=filehost\ndb.port=5432\n").unwrap();

        let mut settings = BootstrapConfig::default();
        settings.local.resource_root = dir.path().to_path_buf();
        settings.set_override("db.port", "6000");

        let assembled = ConfigAssembler::new(&settings, read_arguments(["--db.host=cli"]))
            .assemble(&descriptor("orders"))
            .await
            .unwrap();
        let config = assembled.shutdown().await;

        assert_eq!(config.get("db.host").as_deref(), Some("cli"));
        assert_eq!(config.get("db.port").as_deref(), Some("6000"));
        assert_eq!(config.source_of("db.port"), Some(LayerKind::Overrides));
        assert_eq!(config.get("server.port").as_deref(), Some("8080"));
        assert!(config.last_modified(LayerKind::Local).is_some());
    }

    #[tokio::test]
    async fn test_location_placeholder_selected_by_argument() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("qa.properties"), "region=${region.default}\nname=qa\n").unwrap();

        let mut settings = BootstrapConfig::default();
        settings.local.resource_root = dir.path().to_path_buf();
        let mut desc = descriptor("orders");
        desc.properties_location = Some("classpath:${profile}.properties".into());

        let args = read_arguments(["--profile=qa", "--region.default=eu"]);
        let config = ConfigAssembler::new(&settings, args)
            .assemble(&desc)
            .await
            .unwrap()
            .shutdown()
            .await;

        assert_eq!(config.get("name").as_deref(), Some("qa"));
        assert_eq!(config.get("region").as_deref(), Some("eu"));
    }

    #[tokio::test]
    async fn test_missing_explicit_location_yields_empty_layer() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = BootstrapConfig::default();
        settings.local.resource_root = dir.path().to_path_buf();
        settings.local.properties = Some("classpath:absent.properties".into());

        let config = ConfigAssembler::new(&settings, Layer::default())
            .assemble(&descriptor("orders"))
            .await
            .unwrap()
            .shutdown()
            .await;
        assert_eq!(config.layer_len(LayerKind::Local), 0);
    }

    #[tokio::test]
    async fn test_remote_layer_uses_descriptor_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        store.put("/dev/orders/2.0/config/db.host", "zkhost");

        let mut settings = BootstrapConfig::default();
        settings.local.resource_root = dir.path().to_path_buf();
        let mut desc = descriptor("orders");
        desc.version = Some("2.0".into());

        let assembled = ConfigAssembler::new(&settings, Layer::default())
            .with_store(Some(Arc::new(store)))
            .assemble(&desc)
            .await
            .unwrap();
        assert!(assembled.bridge.is_some());
        let config = assembled.shutdown().await;
        assert_eq!(config.get("db.host").as_deref(), Some("zkhost"));
        assert_eq!(config.source_of("db.host"), Some(LayerKind::Remote));
    }

    #[tokio::test]
    async fn test_required_remote_without_store() {
        let settings = BootstrapConfig::default();
        let mut desc = descriptor("orders");
        desc.remote_required = true;
        let err = ConfigAssembler::new(&settings, Layer::default())
            .assemble(&desc)
            .await
            .unwrap_err();
        assert!(matches!(err, AssemblyError::RemoteNotConfigured(_)));
    }
}
