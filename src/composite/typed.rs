//! Typed value parsing.

use std::str::FromStr;
use thiserror::Error;

/// A value exists but does not parse as the requested type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Config key '{key}' has value '{value}' which is not a valid {expected}: {reason}")]
pub struct ConfigTypeError {
    pub key: String,
    pub value: String,
    pub expected: &'static str,
    pub reason: String,
}

pub(crate) fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigTypeError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigTypeError {
        key: key.to_string(),
        value: value.to_string(),
        expected: std::any::type_name::<T>(),
        reason: e.to_string(),
    })
}

pub(crate) fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigTypeError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigTypeError {
            key: key.to_string(),
            value: value.to_string(),
            expected: "bool",
            reason: "expected true/false, yes/no, on/off or 1/0".to_string(),
        }),
    }
}
