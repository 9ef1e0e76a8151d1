//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)            environment (PROXY_AUTH, RELAY_*)
//!     → loader.rs (parse & deserialize, overlay env)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, resolve_config, ConfigError};
pub use schema::FetchConfig;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::ProxySettings;
pub use schema::RelayConfig;
pub use schema::SecurityConfig;
