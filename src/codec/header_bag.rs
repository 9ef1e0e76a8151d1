//! Custom header bag threaded through every rewrite hop.

use std::collections::BTreeMap;

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::codec::DecodeError;

/// Headers that describe the hop rather than the resource. They are dropped
/// when a bag is turned into outbound request headers.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Flat string-to-string header mapping supplied by the client.
///
/// Keys are kept sorted so the JSON form is identical at every nesting level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderBag(BTreeMap<String, String>);

impl HeaderBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse the JSON object form. Nested values, arrays, numbers and
    /// non-object documents are rejected.
    pub fn from_json(raw: &str) -> Result<Self, DecodeError> {
        serde_json::from_str::<BTreeMap<String, String>>(raw)
            .map(Self)
            .map_err(|_| DecodeError::MalformedHeaders)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| String::from("{}"))
    }

    /// Check that every entry is a legal HTTP header.
    pub fn validate(&self) -> Result<(), DecodeError> {
        for (name, value) in &self.0 {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| DecodeError::InvalidHeader(name.clone()))?;
            HeaderValue::from_str(value).map_err(|_| DecodeError::InvalidHeader(name.clone()))?;
        }
        Ok(())
    }

    /// Outbound origin headers: the bag itself, minus hop-by-hop entries,
    /// plus `default_user_agent` when the bag does not name one.
    pub fn to_header_map(&self, default_user_agent: &str) -> Result<HeaderMap, DecodeError> {
        let mut map = HeaderMap::with_capacity(self.0.len() + 1);
        for (name, value) in &self.0 {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| DecodeError::InvalidHeader(name.clone()))?;
            if HOP_BY_HOP.contains(&header_name.as_str()) {
                continue;
            }
            let header_value =
                HeaderValue::from_str(value).map_err(|_| DecodeError::InvalidHeader(name.clone()))?;
            map.insert(header_name, header_value);
        }

        if !map.contains_key(header::USER_AGENT) {
            if let Ok(ua) = HeaderValue::from_str(default_user_agent) {
                map.insert(header::USER_AGENT, ua);
            }
        }
        Ok(map)
    }
}

impl<K, V> FromIterator<(K, V)> for HeaderBag
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
