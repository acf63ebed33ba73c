//! Extraction targets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where extracted configuration goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    File,
    Remote,
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMode::File => f.write_str("file"),
            ExtractionMode::Remote => f.write_str("remote"),
        }
    }
}

impl FromStr for ExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(ExtractionMode::File),
            "remote" => Ok(ExtractionMode::Remote),
            other => Err(format!("unknown extraction mode '{}', expected 'file' or 'remote'", other)),
        }
    }
}

/// A destination for the assembled configuration.
///
/// For `File` the path names the output file. `Remote` targets always write
/// under the base node path derived from environment, application and
/// version, and carry no path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionTarget {
    pub mode: ExtractionMode,
    pub path: Option<String>,
    pub overwrite: bool,
}

impl ExtractionTarget {
    /// File targets are always rewritten in full.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            mode: ExtractionMode::File,
            path: Some(path.into()),
            overwrite: true,
        }
    }

    /// Remote target under the application's derived base path.
    pub fn remote(overwrite: bool) -> Self {
        Self {
            mode: ExtractionMode::Remote,
            path: None,
            overwrite,
        }
    }
}
