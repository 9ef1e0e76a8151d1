//! HLS-aware content relay library.

pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod http;
pub mod lifecycle;
pub mod manifest;
pub mod observability;
pub mod security;

pub use config::schema::RelayConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
