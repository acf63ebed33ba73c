//! Bundled framework defaults.

use crate::composite::Layer;
use crate::sources::properties::{parse_toml, SourceError};

const BUNDLED_DEFAULTS: &str = include_str!("defaults.toml");

/// The defaults layer compiled into the crate.
pub fn bundled_defaults() -> Result<Layer, SourceError> {
    parse_toml(BUNDLED_DEFAULTS, "bundled defaults")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_defaults_parse() {
        let layer = bundled_defaults().unwrap();
        assert_eq!(layer.get("server.port"), Some("8080"));
        assert_eq!(layer.get("app.environment"), Some("dev"));
        assert_eq!(layer.get("discovery.enabled"), Some("false"));
    }
}
