//! Rewriting playlist references back through the relay.

use thiserror::Error;
use url::Url;

use crate::codec::{self, HeaderBag, ProxyEndpoint};
use crate::manifest::document::ManifestDocument;

const PROXYABLE_SCHEMES: [&str; 4] = ["http", "https", "ftp", "ftps"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    #[error("manifest is not valid UTF-8")]
    InvalidEncoding,
}

/// Rewritten playlist text and how many references were replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub text: String,
    pub rewritten: usize,
}

/// Rewrites every reference with the same auth code and header bag as the
/// request that fetched the playlist.
#[derive(Debug, Clone, Copy)]
pub struct Rewriter<'a> {
    endpoint: &'a ProxyEndpoint,
    auth: &'a str,
    headers: Option<&'a HeaderBag>,
}

impl<'a> Rewriter<'a> {
    pub fn new(endpoint: &'a ProxyEndpoint, auth: &'a str, headers: Option<&'a HeaderBag>) -> Self {
        Self {
            endpoint,
            auth,
            headers,
        }
    }

    pub fn rewrite(&self, text: &str, base: &Url) -> Rewritten {
        let doc = ManifestDocument::parse(text, base);
        let mut out = String::with_capacity(text.len() + doc.uri_count() * 128);
        let mut rewritten = 0;

        for line in doc.lines() {
            let target = line
                .uri
                .as_ref()
                .and_then(|uri| uri.resolved.as_deref().filter(|r| is_proxyable(r)).map(|r| (uri, r)));

            match target {
                Some((uri, absolute)) => {
                    out.push_str(&line.content[..uri.span.start]);
                    out.push_str(&codec::encode(self.endpoint, absolute, self.auth, self.headers));
                    out.push_str(&line.content[uri.span.end..]);
                    rewritten += 1;
                }
                None => {
                    if let Some(uri) = &line.uri {
                        tracing::debug!(reference = uri.raw, "manifest reference left unchanged");
                    }
                    out.push_str(line.content);
                }
            }
            out.push_str(line.terminator);
        }

        Rewritten {
            text: out,
            rewritten,
        }
    }

    /// Rewrite raw bytes. Malformed UTF-8 is an error; nothing partial is
    /// returned.
    pub fn rewrite_bytes(&self, bytes: &[u8], base: &Url) -> Result<Rewritten, RewriteError> {
        let text = std::str::from_utf8(bytes).map_err(|_| RewriteError::InvalidEncoding)?;
        Ok(self.rewrite(text, base))
    }
}

/// One-shot form of [`Rewriter::rewrite`].
pub fn rewrite(
    text: &str,
    base: &Url,
    endpoint: &ProxyEndpoint,
    auth: &str,
    headers: Option<&HeaderBag>,
) -> String {
    Rewriter::new(endpoint, auth, headers).rewrite(text, base).text
}

/// `data:`, `skd:` and similar references are not fetchable through the relay.
fn is_proxyable(reference: &str) -> bool {
    reference
        .split_once(':')
        .is_some_and(|(scheme, _)| PROXYABLE_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()))
}
