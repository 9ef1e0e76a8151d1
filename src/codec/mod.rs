//! Proxy URL codec.
//!
//! # Data Flow
//! ```text
//! inbound query ──decode_query──► ProxyRequest ──(dispatch / rewrite)──► encode ──► nested proxy URL
//! ```
//!
//! # Responsibilities
//! - Build `<endpoint>?url=..&auth=..[&headers=..]` proxy URLs
//! - Parse them back into a typed `ProxyRequest`
//! - Carry the header bag byte-stable across any number of hops
//!
//! # Design Decisions
//! - Every parameter value is percent-encoded as one opaque token, so a proxy
//!   URL is itself a safe `url=` payload for an outer encode
//! - `headers` is omitted when the bag is absent or empty
//! - Pure functions, no I/O

pub mod header_bag;
pub mod proxy_url;

use thiserror::Error;

pub use header_bag::HeaderBag;
pub use proxy_url::{decode, decode_query, encode, FetchMethod, ForcedKind, ProxyEndpoint, ProxyRequest};

/// Reasons a proxy query cannot be turned into a `ProxyRequest`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("missing required parameter: url")]
    MissingUrl,

    #[error("missing required parameter: auth")]
    MissingAuth,

    #[error("url must be an absolute http, https, ftp or ftps URI")]
    InvalidUrl,

    #[error("headers must be a JSON object of string values")]
    MalformedHeaders,

    #[error("invalid header in bag: {0}")]
    InvalidHeader(String),
}
