//! The composite configuration.
//!
//! # Responsibilities
//! - Own the five layers and the merged effective view
//! - Recompute only the keys touched by a mutation
//! - Emit change events when, and only when, an effective value changes
//!
//! # Concurrency
//! Readers load an immutable map through `ArcSwap` and never block.
//! Writers serialize on one mutex, publish the new map once the whole
//! mutation is applied, then deliver events on the calling thread while
//! still holding the mutex. Subscribers must not mutate the same
//! configuration from inside a handler; doing so deadlocks.

use arc_swap::ArcSwap;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use crate::composite::events::{ChangeEvent, Subscriber, SubscriptionId};
use crate::composite::layer::{Layer, LayerKind};
use crate::composite::typed::{parse_bool, parse_value, ConfigTypeError};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Effective {
    value: String,
    layer: LayerKind,
}

type EffectiveMap = HashMap<String, Effective>;

struct Writer {
    layers: [Layer; 5],
    subscribers: Vec<Subscriber>,
    next_subscription: u64,
}

impl Writer {
    fn resolve(&self, key: &str) -> Option<Effective> {
        LayerKind::ALL.iter().find_map(|&kind| {
            self.layers[kind.index()].get(key).map(|value| Effective {
                value: value.to_string(),
                layer: kind,
            })
        })
    }

    fn first_seen_scan(&self) -> Vec<(String, Effective)> {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for kind in LayerKind::ALL {
            for (key, value) in self.layers[kind.index()].iter() {
                if seen.insert(key) {
                    entries.push((
                        key.to_string(),
                        Effective {
                            value: value.to_string(),
                            layer: kind,
                        },
                    ));
                }
            }
        }
        entries
    }
}

struct Shared {
    effective: ArcSwap<EffectiveMap>,
    writer: Mutex<Writer>,
}

/// Ordered, flattened view of every effective key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: Vec<(String, String)>,
}

impl Snapshot {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for Snapshot {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Handle to a merged, layered configuration. Cloning shares the same instance.
#[derive(Clone)]
pub struct Configuration {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("keys", &self.shared.effective.load().len())
            .finish()
    }
}

impl Configuration {
    /// A configuration with every layer empty.
    pub fn empty() -> Self {
        Self::from_layers(std::iter::empty())
    }

    /// Build from initial layer contents; unspecified layers start empty.
    pub fn from_layers<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = (LayerKind, Layer)>,
    {
        let mut slots: [Layer; 5] = Default::default();
        for (kind, layer) in layers {
            slots[kind.index()] = layer;
        }

        let writer = Writer {
            layers: slots,
            subscribers: Vec::new(),
            next_subscription: 0,
        };
        let effective: EffectiveMap = writer.first_seen_scan().into_iter().collect();

        Self {
            shared: Arc::new(Shared {
                effective: ArcSwap::from_pointee(effective),
                writer: Mutex::new(writer),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Writer> {
        self.shared.writer.lock().unwrap_or_else(|e| e.into_inner())
    }

    // --- Reads ---

    /// Effective value, or `None` when no layer defines the key.
    pub fn get(&self, key: &str) -> Option<String> {
        self.shared.effective.load().get(key).map(|e| e.value.clone())
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.shared.effective.load().contains_key(key)
    }

    /// Layer currently supplying the effective value.
    pub fn source_of(&self, key: &str) -> Option<LayerKind> {
        self.shared.effective.load().get(key).map(|e| e.layer)
    }

    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>, ConfigTypeError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key).map(|v| parse_value(key, &v)).transpose()
    }

    pub fn get_parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigTypeError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        Ok(self.get_parsed(key)?.unwrap_or(default))
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigTypeError> {
        self.get(key).map(|v| parse_bool(key, &v)).transpose()
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigTypeError> {
        Ok(self.get_bool(key)?.unwrap_or(default))
    }

    pub fn get_i64(&self, key: &str) -> Result<Option<i64>, ConfigTypeError> {
        self.get_parsed(key)
    }

    pub fn get_u64(&self, key: &str) -> Result<Option<u64>, ConfigTypeError> {
        self.get_parsed(key)
    }

    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, ConfigTypeError> {
        self.get_parsed(key)
    }

    /// Every effective key, ordered by first appearance scanning layers in precedence order.
    pub fn snapshot(&self) -> Snapshot {
        let writer = self.lock();
        Snapshot {
            entries: writer
                .first_seen_scan()
                .into_iter()
                .map(|(k, e)| (k, e.value))
                .collect(),
        }
    }

    pub fn last_modified(&self, layer: LayerKind) -> Option<SystemTime> {
        self.lock().layers[layer.index()].last_modified()
    }

    pub fn layer_len(&self, layer: LayerKind) -> usize {
        self.lock().layers[layer.index()].len()
    }

    /// Raw value held by one layer, ignoring precedence.
    pub fn layer_value(&self, layer: LayerKind, key: &str) -> Option<String> {
        self.lock().layers[layer.index()].get(key).map(str::to_string)
    }

    // --- Subscriptions ---

    /// Register `handler` for change events whose key satisfies `predicate`.
    pub fn subscribe<P, H>(&self, predicate: P, handler: H) -> SubscriptionId
    where
        P: Fn(&str) -> bool + Send + Sync + 'static,
        H: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let mut writer = self.lock();
        writer.next_subscription += 1;
        let id = SubscriptionId(writer.next_subscription);
        writer.subscribers.push(Subscriber::new(id, predicate, handler));
        id
    }

    /// Subscribe to every key starting with `prefix`.
    pub fn subscribe_prefix<H>(&self, prefix: impl Into<String>, handler: H) -> SubscriptionId
    where
        H: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let prefix = prefix.into();
        self.subscribe(move |key| key.starts_with(&prefix), handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut writer = self.lock();
        let before = writer.subscribers.len();
        writer.subscribers.retain(|s| s.id != id);
        writer.subscribers.len() != before
    }

    // --- Mutations ---

    pub fn set(&self, layer: LayerKind, key: impl Into<String>, value: impl Into<String>) -> Vec<ChangeEvent> {
        let key = key.into();
        let mut writer = self.lock();
        writer.layers[layer.index()].insert(key.clone(), value.into());
        self.commit(&mut writer, layer, vec![key])
    }

    pub fn remove(&self, layer: LayerKind, key: &str) -> Vec<ChangeEvent> {
        let mut writer = self.lock();
        if writer.layers[layer.index()].remove(key).is_none() {
            return Vec::new();
        }
        self.commit(&mut writer, layer, vec![key.to_string()])
    }

    /// Replace a layer's whole content as one atomic batch.
    ///
    /// Readers never observe a partially replaced layer, and events are
    /// emitted only for keys whose effective value differs afterwards.
    pub fn replace_layer<I>(&self, layer: LayerKind, entries: I, last_modified: Option<SystemTime>) -> Vec<ChangeEvent>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut replacement = Layer::from_entries(entries);
        replacement.set_last_modified(last_modified);

        let mut writer = self.lock();
        let slot = &mut writer.layers[layer.index()];
        let mut touched: Vec<String> = slot.keys().map(str::to_string).collect();
        let mut known: HashSet<String> = touched.iter().cloned().collect();
        for key in replacement.keys() {
            if known.insert(key.to_string()) {
                touched.push(key.to_string());
            }
        }
        *slot = replacement;
        self.commit(&mut writer, layer, touched)
    }

    /// Mark when a layer was last updated without changing its values.
    pub fn touch_layer(&self, layer: LayerKind, at: SystemTime) {
        self.lock().layers[layer.index()].set_last_modified(Some(at));
    }

    fn commit(&self, writer: &mut Writer, mutated: LayerKind, keys: Vec<String>) -> Vec<ChangeEvent> {
        let current = self.shared.effective.load_full();
        let mut next: Option<EffectiveMap> = None;
        let mut events = Vec::new();

        for key in keys {
            let old = current.get(&key);
            let new = writer.resolve(&key);
            if old == new.as_ref() {
                continue;
            }

            let map = next.get_or_insert_with(|| (*current).clone());
            let old_value = old.map(|e| e.value.clone());
            let new_value = new.as_ref().map(|e| e.value.clone());
            let layer = new.as_ref().map(|e| e.layer).unwrap_or(mutated);
            match new {
                Some(effective) => map.insert(key.clone(), effective),
                None => map.remove(&key),
            };

            // A different layer may now supply an identical value; only the source moved.
            if old_value != new_value {
                events.push(ChangeEvent {
                    key,
                    old_value,
                    new_value,
                    layer,
                });
            }
        }

        if let Some(map) = next {
            self.shared.effective.store(Arc::new(map));
        }

        for event in &events {
            tracing::debug!(
                key = %event.key,
                layer = %event.layer,
                old = ?event.old_value,
                new = ?event.new_value,
                "Effective configuration value changed"
            );
            for subscriber in &writer.subscribers {
                subscriber.deliver(event);
            }
        }
        events
    }
}
