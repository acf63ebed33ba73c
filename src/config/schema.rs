//! Bootstrap settings schema.
//!
//! These settings configure the launcher itself: which environment to
//! resolve against, where the remote store lives, where classpath resources
//! are found and how to log. They are distinct from the application
//! configuration the bootstrap assembles.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::composite::Layer;
use crate::sources::properties::flatten_table;

/// Root bootstrap settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Environment segment of the remote path (e.g., "dev", "prod").
    pub environment: String,

    /// Version segment of the remote path, used when the descriptor declares none.
    pub version: String,

    /// Remote store connection.
    pub remote: RemoteSettings,

    /// Local properties resolution.
    pub local: LocalSettings,

    /// Logging settings.
    pub logging: LoggingSettings,

    /// Explicit system overrides (second-highest precedence).
    pub overrides: toml::Table,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            environment: "dev".to_string(),
            version: "1.0".to_string(),
            remote: RemoteSettings::default(),
            local: LocalSettings::default(),
            logging: LoggingSettings::default(),
            overrides: toml::Table::new(),
        }
    }
}

impl BootstrapConfig {
    /// Overrides flattened into dotted keys.
    pub fn overrides_layer(&self) -> Layer {
        let mut layer = Layer::default();
        flatten_table("", &self.overrides, &mut layer);
        layer
    }

    /// Add or replace a single override.
    pub fn set_override(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.overrides
            .insert(key.into(), toml::Value::String(value.into()));
    }
}

/// Remote store connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// `file:///dir` or `memory:`. No endpoint means no remote layer.
    pub endpoint: Option<String>,

    /// Initial reconnect delay in milliseconds.
    pub reconnect_base_ms: u64,

    /// Reconnect delay cap in milliseconds.
    pub reconnect_max_ms: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            reconnect_base_ms: 100,
            reconnect_max_ms: 10_000,
        }
    }
}

/// Local properties settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LocalSettings {
    /// Directory that `classpath:` locations resolve against.
    pub resource_root: PathBuf,

    /// Replaces the descriptor's properties location.
    pub properties: Option<String>,
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            resource_root: PathBuf::from("."),
            properties: None,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive; `RUST_LOG` takes precedence.
    pub level: String,

    /// "pretty" or "json".
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
