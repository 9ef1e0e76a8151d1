//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the media relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, connection cap).
    pub listener: ListenerConfig,

    /// Proxy protocol settings (auth secret, public URL, route prefix).
    pub proxy: ProxySettings,

    /// Outbound origin fetch settings.
    pub fetch: FetchConfig,

    /// Request gate hardening.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent in-flight requests (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Settings for the `/proxy` query protocol.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Shared secret every proxy request must carry as `auth`.
    pub auth_code: String,

    /// Externally visible base URL (scheme + host [+ port]) used when
    /// building rewritten URLs. Derived from request headers when unset.
    pub public_base_url: Option<String>,

    /// Path prefix mounted in front of `/proxy`, `/health` and `/status`.
    pub route_prefix: String,
}

/// Placeholder secret shipped in the defaults. Startup warns while it is in use.
pub const DEFAULT_AUTH_CODE: &str = "CHANGE_ME";

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            // WARNING: placeholder, override via config or PROXY_AUTH.
            auth_code: DEFAULT_AUTH_CODE.to_string(),
            public_base_url: None,
            route_prefix: String::new(),
        }
    }
}

impl ProxySettings {
    /// Route prefix normalised to either `""` or `/segment[/segment...]`.
    pub fn route_prefix(&self) -> String {
        normalize_prefix(&self.route_prefix)
    }
}

pub(crate) fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Origin fetch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request origin timeout in milliseconds.
    pub timeout_ms: u64,

    /// User-Agent sent when the caller's header bag does not carry one.
    pub user_agent: String,

    /// Upper bound on a manifest body buffered for rewriting.
    pub max_manifest_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 8_000,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            max_manifest_bytes: 10 * 1024 * 1024,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Request gate hardening.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum size of the serialized header bag.
    pub max_header_bag_bytes: usize,

    /// Refuse targets whose host is a loopback/private/link-local literal.
    pub deny_private_targets: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_header_bag_bytes: 8 * 1024,
            deny_private_targets: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
