//! Configuration layers.
//!
//! # Precedence (highest first)
//! ```text
//! Arguments → Overrides → Remote → Local → Defaults
//! ```

use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;

/// Identifies one of the five fixed configuration layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerKind {
    Arguments,
    Overrides,
    Remote,
    Local,
    Defaults,
}

impl LayerKind {
    /// All layers in precedence order.
    pub const ALL: [LayerKind; 5] = [
        LayerKind::Arguments,
        LayerKind::Overrides,
        LayerKind::Remote,
        LayerKind::Local,
        LayerKind::Defaults,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LayerKind::Arguments => "arguments",
            LayerKind::Overrides => "overrides",
            LayerKind::Remote => "remote",
            LayerKind::Local => "local",
            LayerKind::Defaults => "defaults",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insertion-ordered key/value pairs of one layer.
#[derive(Debug, Clone, Default)]
pub struct Layer {
    order: Vec<String>,
    values: HashMap<String, String>,
    last_modified: Option<SystemTime>,
}

impl Layer {
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut layer = Self::default();
        for (key, value) in entries {
            layer.insert(key, value);
        }
        layer
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Insert or replace a value; a replaced key keeps its original position.
    pub fn insert(&mut self, key: String, value: String) -> Option<String> {
        if !self.values.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.values.insert(key, value)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let removed = self.values.remove(key)?;
        self.order.retain(|k| k != key);
        Some(removed)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order
            .iter()
            .filter_map(move |k| self.values.get(k).map(|v| (k.as_str(), v.as_str())))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    pub fn set_last_modified(&mut self, at: Option<SystemTime>) {
        self.last_modified = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_keeps_position() {
        let mut layer = Layer::default();
        layer.insert("a".into(), "1".into());
        layer.insert("b".into(), "2".into());
        layer.insert("a".into(), "3".into());

        let entries: Vec<_> = layer.iter().collect();
        assert_eq!(entries, vec![("a", "3"), ("b", "2")]);

        layer.remove("a");
        assert_eq!(layer.keys().collect::<Vec<_>>(), vec!["b"]);
        assert!(layer.remove("a").is_none());
    }

    #[test]
    fn test_precedence_order() {
        assert!(LayerKind::Arguments < LayerKind::Remote);
        assert!(LayerKind::Remote < LayerKind::Local);
        assert_eq!(LayerKind::ALL[LayerKind::Defaults.index()], LayerKind::Defaults);
    }
}
