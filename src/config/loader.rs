//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Environment variables that override file settings.
pub const ENV_AUTH: &str = "PROXY_AUTH";
pub const ENV_BIND: &str = "RELAY_BIND";
pub const ENV_PUBLIC_BASE_URL: &str = "RELAY_PUBLIC_BASE_URL";
pub const ENV_ROUTE_PREFIX: &str = "RELAY_ROUTE_PREFIX";

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: RelayConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay values from `lookup` (normally the process environment).
pub fn apply_overrides<F>(config: &mut RelayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(auth) = lookup(ENV_AUTH) {
        config.proxy.auth_code = auth;
    }
    if let Some(bind) = lookup(ENV_BIND) {
        config.listener.bind_address = bind;
    }
    if let Some(base) = lookup(ENV_PUBLIC_BASE_URL) {
        config.proxy.public_base_url = Some(base).filter(|b| !b.trim().is_empty());
    }
    if let Some(prefix) = lookup(ENV_ROUTE_PREFIX) {
        config.proxy.route_prefix = prefix;
    }
}

/// Build the startup configuration: file (or defaults), then environment,
/// then validation. The result is frozen for the life of the process.
pub fn resolve_config(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => RelayConfig::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
