//! Bootstrap settings validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that path segments are usable in the remote layout
//! - Validate value ranges (backoff base > 0, base <= max)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BootstrapConfig → Result<(), Vec<ValidationError>>

use std::fmt;

use crate::config::schema::BootstrapConfig;

/// A single semantic violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const LOG_FORMATS: [&str; 2] = ["pretty", "json"];

fn check_segment(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError::new(field, "must not be empty"));
    } else if value.contains('/') {
        errors.push(ValidationError::new(field, format!("'{}' must not contain '/'", value)));
    }
}

/// Check every semantic rule and report all violations.
pub fn validate_config(config: &BootstrapConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_segment(&mut errors, "environment", &config.environment);
    check_segment(&mut errors, "version", &config.version);

    let remote = &config.remote;
    if remote.reconnect_base_ms == 0 {
        errors.push(ValidationError::new("remote.reconnect_base_ms", "must be greater than 0"));
    } else if remote.reconnect_base_ms > remote.reconnect_max_ms {
        errors.push(ValidationError::new(
            "remote.reconnect_base_ms",
            format!(
                "{} exceeds remote.reconnect_max_ms ({})",
                remote.reconnect_base_ms, remote.reconnect_max_ms
            ),
        ));
    }

    if let Some(endpoint) = &remote.endpoint {
        if endpoint.trim() != "memory:" && url::Url::parse(endpoint.trim()).is_err() {
            errors.push(ValidationError::new(
                "remote.endpoint",
                format!("'{}' is not a valid URI", endpoint),
            ));
        }
    }

    if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
        errors.push(ValidationError::new(
            "logging.format",
            format!("unknown format '{}', expected one of {:?}", config.logging.format, LOG_FORMATS),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
