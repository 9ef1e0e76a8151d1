//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Validate URL-shaped settings before they reach the codec
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use axum::http::HeaderValue;
use url::Url;

use crate::config::schema::RelayConfig;

/// A single semantic problem in a configuration.
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

/// Validate a parsed configuration.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be greater than 0"));
    }

    if config.proxy.auth_code.trim().is_empty() {
        errors.push(ValidationError::new("proxy.auth_code", "must not be empty"));
    }
    if let Some(base) = &config.proxy.public_base_url {
        match Url::parse(base) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
                if url.query().is_some() || url.fragment().is_some() {
                    errors.push(ValidationError::new(
                        "proxy.public_base_url",
                        "must not carry a query or fragment",
                    ));
                }
            }
            _ => errors.push(ValidationError::new(
                "proxy.public_base_url",
                format!("'{}' is not an absolute http(s) URL", base),
            )),
        }
    }
    if config.proxy.route_prefix.contains(&['?', '#', ' '][..]) {
        errors.push(ValidationError::new(
            "proxy.route_prefix",
            "must be a plain path without query, fragment or spaces",
        ));
    }

    if config.fetch.timeout_ms == 0 {
        errors.push(ValidationError::new("fetch.timeout_ms", "must be greater than 0"));
    }
    if config.fetch.max_manifest_bytes == 0 {
        errors.push(ValidationError::new("fetch.max_manifest_bytes", "must be greater than 0"));
    }
    if HeaderValue::from_str(&config.fetch.user_agent).is_err() {
        errors.push(ValidationError::new("fetch.user_agent", "is not a valid header value"));
    }

    if config.security.max_header_bag_bytes == 0 {
        errors.push(ValidationError::new(
            "security.max_header_bag_bytes",
            "must be greater than 0",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
