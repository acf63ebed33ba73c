//! Process-argument reader.
//!
//! Accepted forms: `--key=value`, `key=value`, `--key value` and a bare
//! `--flag` (read as `"true"`). Anything else is ignored.

use crate::composite::Layer;

/// Parse process arguments into the highest-precedence layer.
pub fn read_arguments<I, S>(args: I) -> Layer
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut layer = Layer::default();
    let mut pending: Option<String> = None;

    for arg in args {
        let arg = arg.as_ref();
        if let Some(stripped) = arg.strip_prefix("--") {
            if let Some(flag) = pending.take() {
                layer.insert(flag, "true".to_string());
            }
            match stripped.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    layer.insert(key.to_string(), value.to_string());
                }
                None if !stripped.is_empty() => pending = Some(stripped.to_string()),
                _ => tracing::debug!(arg = %arg, "Ignoring malformed argument"),
            }
        } else if let Some(key) = pending.take() {
            layer.insert(key, arg.to_string());
        } else {
            match arg.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    layer.insert(key.to_string(), value.to_string());
                }
                _ => tracing::debug!(arg = %arg, "Ignoring positional argument"),
            }
        }
    }

    if let Some(flag) = pending {
        layer.insert(flag, "true".to_string());
    }
    layer
}
