//! Local properties resources.
//!
//! # Responsibilities
//! - Interpret a URI-like location (`classpath:`, `file:` or a plain path)
//! - Parse flat `key=value` text, or flatten a `.toml` document into dotted keys
//! - Report the resource's modification time

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use url::Url;

use crate::composite::Layer;

/// Errors reading a properties resource.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Invalid properties location '{0}'")]
    InvalidLocation(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML {origin}: {source}")]
    Toml {
        origin: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Where a properties resource lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertiesLocation {
    /// Relative to the configured resource root.
    Classpath(String),
    File(PathBuf),
}

impl PropertiesLocation {
    pub fn parse(raw: &str) -> Result<Self, SourceError> {
        let raw = raw.trim();
        if let Some(rel) = raw.strip_prefix("classpath:") {
            let rel = rel.trim_start_matches('/');
            if rel.is_empty() {
                return Err(SourceError::InvalidLocation(raw.to_string()));
            }
            return Ok(PropertiesLocation::Classpath(rel.to_string()));
        }
        if raw.starts_with("file:") {
            let url = Url::parse(raw).map_err(|_| SourceError::InvalidLocation(raw.to_string()))?;
            let path = url
                .to_file_path()
                .map_err(|_| SourceError::InvalidLocation(raw.to_string()))?;
            return Ok(PropertiesLocation::File(path));
        }
        if raw.is_empty() {
            return Err(SourceError::InvalidLocation(raw.to_string()));
        }
        Ok(PropertiesLocation::File(PathBuf::from(raw)))
    }

    pub fn resolve(&self, resource_root: &Path) -> PathBuf {
        match self {
            PropertiesLocation::Classpath(rel) => resource_root.join(rel),
            PropertiesLocation::File(path) => path.clone(),
        }
    }
}

/// Parse `key=value` / `key: value` lines.
///
/// `#` and `!` start comments. A repeated key replaces the earlier value.
/// A backslash escapes the next character; `\n`, `\r` and `\t` stand for
/// the control characters. Whitespace around keys and values is dropped
/// unless escaped.
pub fn parse_properties(text: &str) -> Layer {
    let mut layer = Layer::default();
    for line in text.lines() {
        let line = line.trim_start();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let (key, value) = split_entry(line);
        if key.is_empty() {
            continue;
        }
        layer.insert(key, value);
    }
    layer
}

/// Split at the first unescaped `=` or `:`, unescaping both halves.
fn split_entry(line: &str) -> (String, String) {
    let mut chars = line.chars();
    let mut key = Unescaped::default();
    let mut separated = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => key.push_escape(chars.next()),
            '=' | ':' => {
                separated = true;
                break;
            }
            c => key.push(c, false),
        }
    }

    let mut value = Unescaped::default();
    if separated {
        while let Some(c) = chars.next() {
            match c {
                '\\' => value.push_escape(chars.next()),
                c => value.push(c, false),
            }
        }
    }
    (key.finish(), value.finish())
}

#[derive(Default)]
struct Unescaped {
    text: String,
    // End of the last character that survives trimming.
    end: usize,
}

impl Unescaped {
    fn push(&mut self, c: char, escaped: bool) {
        if c.is_whitespace() && !escaped {
            if !self.text.is_empty() {
                self.text.push(c);
            }
            return;
        }
        self.text.push(c);
        self.end = self.text.len();
    }

    fn push_escape(&mut self, next: Option<char>) {
        let c = match next {
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some(c) => c,
            None => '\\',
        };
        self.push(c, true);
    }

    fn finish(mut self) -> String {
        self.text.truncate(self.end);
        self.text
    }
}

fn push_control(out: &mut String, c: char) -> bool {
    let escaped = match c {
        '\\' => "\\\\",
        '\n' => "\\n",
        '\r' => "\\r",
        '\t' => "\\t",
        _ => return false,
    };
    out.push_str(escaped);
    true
}

/// Escape a key so it reads back as one key on one line.
pub fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for (i, c) in key.chars().enumerate() {
        if push_control(&mut out, c) {
            continue;
        }
        let special = matches!(c, '=' | ':') || c.is_whitespace() || (i == 0 && matches!(c, '#' | '!'));
        if special {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a value so it reads back unchanged, outer whitespace included.
pub fn escape_value(value: &str) -> String {
    let body_start = value.len() - value.trim_start().len();
    let body_end = value.trim_end().len();
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.char_indices() {
        if push_control(&mut out, c) {
            continue;
        }
        if c.is_whitespace() && (i < body_start || i >= body_end) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Flatten a TOML document into dotted keys, sorted by key within each table.
pub fn parse_toml(text: &str, origin: &str) -> Result<Layer, SourceError> {
    let table: toml::Table = toml::from_str(text).map_err(|source| SourceError::Toml {
        origin: origin.to_string(),
        source,
    })?;
    let mut layer = Layer::default();
    flatten_table("", &table, &mut layer);
    Ok(layer)
}

pub(crate) fn flatten_table(prefix: &str, table: &toml::Table, layer: &mut Layer) {
    for (key, value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        flatten_value(path, value, layer);
    }
}

fn flatten_value(path: String, value: &toml::Value, layer: &mut Layer) {
    match value {
        toml::Value::Table(table) => flatten_table(&path, table, layer),
        toml::Value::Array(items) if items.iter().any(|v| v.is_table()) => {
            for (i, item) in items.iter().enumerate() {
                flatten_value(format!("{}.{}", path, i), item, layer);
            }
        }
        toml::Value::Array(items) => {
            let joined: Vec<String> = items.iter().map(scalar_to_string).collect();
            layer.insert(path, joined.join(","));
        }
        other => {
            layer.insert(path, scalar_to_string(other));
        }
    }
}

fn scalar_to_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Read a resource; `Ok(None)` when it does not exist.
pub fn read_properties(path: &Path) -> Result<Option<Layer>, SourceError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SourceError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut layer = if path.extension().is_some_and(|ext| ext == "toml") {
        parse_toml(&text, &path.display().to_string())?
    } else {
        parse_properties(&text)
    };

    let modified: Option<SystemTime> = fs::metadata(path).and_then(|m| m.modified()).ok();
    layer.set_last_modified(modified);

    tracing::debug!(path = %path.display(), keys = layer.len(), "Properties resource read");
    Ok(Some(layer))
}
