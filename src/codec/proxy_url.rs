//! Encoding and decoding of the `/proxy` query protocol.

use std::fmt;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use url::Url;

use crate::codec::{DecodeError, HeaderBag};
use crate::config::schema::normalize_prefix;

const SUPPORTED_SCHEMES: [&str; 4] = ["http", "https", "ftp", "ftps"];

/// Method the relay uses towards the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMethod {
    #[default]
    Get,
    Head,
}

impl FetchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchMethod::Get => "GET",
            FetchMethod::Head => "HEAD",
        }
    }
}

/// Explicit content handling requested through `type=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedKind {
    Manifest,
    File,
}

impl ForcedKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "m3u8" | "manifest" | "hls" => Some(ForcedKind::Manifest),
            "file" | "raw" => Some(ForcedKind::File),
            _ => None,
        }
    }

    fn as_param(&self) -> &'static str {
        match self {
            ForcedKind::Manifest => "m3u8",
            ForcedKind::File => "file",
        }
    }
}

/// Absolute URL of the relay's own `/proxy` route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint(String);

impl ProxyEndpoint {
    /// `base` is scheme + authority (e.g. `https://relay.example`), `prefix`
    /// the configured route prefix.
    pub fn new(base: &str, prefix: &str) -> Self {
        Self(format!(
            "{}{}/proxy",
            base.trim_end_matches('/'),
            normalize_prefix(prefix)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A decoded proxy request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    pub target: Url,
    pub auth: String,
    pub headers: Option<HeaderBag>,
    pub kind: Option<ForcedKind>,
    pub method: FetchMethod,
}

impl ProxyRequest {
    pub fn new(target: Url, auth: impl Into<String>) -> Self {
        Self {
            target,
            auth: auth.into(),
            headers: None,
            kind: None,
            method: FetchMethod::Get,
        }
    }

    pub fn with_headers(mut self, headers: HeaderBag) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_kind(mut self, kind: ForcedKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_method(mut self, method: FetchMethod) -> Self {
        self.method = method;
        self
    }

    /// Proxy URL for this request. `method` is not part of the protocol.
    pub fn encode(&self, endpoint: &ProxyEndpoint) -> String {
        let mut out = encode(endpoint, self.target.as_str(), &self.auth, self.headers.as_ref());
        if let Some(kind) = self.kind {
            out.push_str("&type=");
            out.push_str(kind.as_param());
        }
        out
    }
}

/// Build a proxy URL for `target`.
///
/// `target` is embedded as given. Callers pass either an absolute origin URL
/// or another proxy URL; both survive as a single opaque value.
pub fn encode(
    endpoint: &ProxyEndpoint,
    target: &str,
    auth: &str,
    headers: Option<&HeaderBag>,
) -> String {
    let mut out = format!(
        "{}?url={}&auth={}",
        endpoint,
        urlencoding::encode(target),
        urlencoding::encode(auth)
    );
    if let Some(bag) = headers.filter(|bag| !bag.is_empty()) {
        out.push_str("&headers=");
        out.push_str(&urlencoding::encode(&bag.to_json()));
    }
    out
}

/// Decode a full proxy URL.
pub fn decode(proxy_url: &str) -> Result<ProxyRequest, DecodeError> {
    let query = proxy_url
        .split_once('?')
        .map(|(_, query)| query)
        .unwrap_or_default();
    let query = query.split_once('#').map_or(query, |(query, _)| query);
    decode_query(query)
}

/// Decode the query component of a proxy URL. The first occurrence of each
/// parameter wins.
pub fn decode_query(query: &str) -> Result<ProxyRequest, DecodeError> {
    let mut url = None;
    let mut auth = None;
    let mut headers = None;
    let mut kind = None;

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "url" if url.is_none() => url = Some(value.into_owned()),
            "auth" if auth.is_none() => auth = Some(value.into_owned()),
            "headers" if headers.is_none() => headers = Some(value.into_owned()),
            "type" if kind.is_none() => kind = Some(value.into_owned()),
            _ => {}
        }
    }

    let raw_url = url.filter(|u| !u.is_empty()).ok_or(DecodeError::MissingUrl)?;
    let auth = auth.filter(|a| !a.is_empty()).ok_or(DecodeError::MissingAuth)?;
    let target = parse_target(&raw_url)?;

    let headers = match headers.filter(|h| !h.is_empty()) {
        Some(raw) => {
            let bag = parse_headers(&raw)?;
            bag.validate()?;
            Some(bag)
        }
        None => None,
    };

    Ok(ProxyRequest {
        target,
        auth,
        headers,
        kind: kind.as_deref().and_then(ForcedKind::parse),
        method: FetchMethod::Get,
    })
}

fn parse_target(raw: &str) -> Result<Url, DecodeError> {
    if let Some(url) = absolute_url(raw) {
        return Ok(url);
    }
    base64_text(raw)
        .as_deref()
        .and_then(absolute_url)
        .ok_or(DecodeError::InvalidUrl)
}

fn absolute_url(raw: &str) -> Option<Url> {
    Url::parse(raw)
        .ok()
        .filter(|url| SUPPORTED_SCHEMES.contains(&url.scheme()) && url.has_host())
}

fn parse_headers(raw: &str) -> Result<HeaderBag, DecodeError> {
    match HeaderBag::from_json(raw) {
        Ok(bag) => Ok(bag),
        Err(err) => base64_text(raw)
            .and_then(|json| HeaderBag::from_json(&json).ok())
            .ok_or(err),
    }
}

/// Some clients send base64 instead of percent-encoding.
fn base64_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let bytes = STANDARD
        .decode(trimmed)
        .or_else(|_| URL_SAFE.decode(trimmed))
        .ok()?;
    String::from_utf8(bytes).ok()
}
