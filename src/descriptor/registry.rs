//! Explicit registry of application types.
//!
//! Application code registers every type that may act as an entry point,
//! together with its markers and lifecycle hooks. Registration order is
//! the scan order used by the resolver.

use std::collections::HashMap;

use crate::composite::Configuration;
use crate::descriptor::marker::Marker;
use crate::lifecycle::hooks::{Hook, HookPhase, HookResult, HookSet};

/// A registered type: name, markers and hooks.
#[derive(Debug, Clone)]
pub struct EntryType {
    name: String,
    markers: Vec<Marker>,
    hooks: HookSet,
}

impl EntryType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            markers: Vec::new(),
            hooks: HookSet::default(),
        }
    }

    pub fn marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Static hook run after the configuration is loaded.
    pub fn on_init<F>(self, body: F) -> Self
    where
        F: Fn(&Configuration) -> HookResult + Send + Sync + 'static,
    {
        self.hook(HookPhase::Init, body)
    }

    /// Instance hook run once the container is ready.
    pub fn on_start<F>(self, body: F) -> Self
    where
        F: Fn(&Configuration) -> HookResult + Send + Sync + 'static,
    {
        self.hook(HookPhase::Start, body)
    }

    /// Instance hook run after the container stopped.
    pub fn on_stop<F>(self, body: F) -> Self
    where
        F: Fn(&Configuration) -> HookResult + Send + Sync + 'static,
    {
        self.hook(HookPhase::Stop, body)
    }

    /// Static hook run last during shutdown.
    pub fn on_destroy<F>(self, body: F) -> Self
    where
        F: Fn(&Configuration) -> HookResult + Send + Sync + 'static,
    {
        self.hook(HookPhase::Destroy, body)
    }

    fn hook<F>(mut self, phase: HookPhase, body: F) -> Self
    where
        F: Fn(&Configuration) -> HookResult + Send + Sync + 'static,
    {
        let label = format!("{}#{}{}", self.name, phase, self.hooks.hooks(phase).len());
        self.hooks.push(phase, Hook::new(label, body));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn hooks(&self) -> &HookSet {
        &self.hooks
    }
}

/// All types known to the application, plus stereotype declarations.
#[derive(Debug, Clone, Default)]
pub struct AppRegistry {
    types: Vec<EntryType>,
    index: HashMap<String, usize>,
    stereotypes: HashMap<String, Marker>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type. A later registration with the same name replaces the earlier one.
    pub fn register(&mut self, entry: EntryType) -> &mut Self {
        match self.index.get(entry.name()) {
            Some(&pos) => self.types[pos] = entry,
            None => {
                self.index.insert(entry.name().to_string(), self.types.len());
                self.types.push(entry);
            }
        }
        self
    }

    /// Declare a stereotype: a named marker tagged with `target`.
    pub fn stereotype(&mut self, name: impl Into<String>, target: Marker) -> &mut Self {
        self.stereotypes.insert(name.into(), target);
        self
    }

    pub fn get(&self, name: &str) -> Option<&EntryType> {
        self.index.get(name).map(|&pos| &self.types[pos])
    }

    pub fn stereotype_target(&self, name: &str) -> Option<&Marker> {
        self.stereotypes.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &EntryType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
