//! Relative reference resolution.

use url::{ParseError, Url};

/// Resolve a playlist reference against the playlist's own URL.
///
/// Absolute references come back exactly as written so that re-proxying
/// never normalises or double-prefixes them. Scheme-relative and
/// path-relative references are resolved per RFC 3986. Returns `None` when
/// the token cannot form a URL.
pub fn resolve(base: &Url, token: &str) -> Option<String> {
    match Url::parse(token) {
        Ok(_) => Some(token.to_string()),
        Err(ParseError::RelativeUrlWithoutBase) => base.join(token).ok().map(String::from),
        Err(_) => None,
    }
}
