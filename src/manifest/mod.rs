//! HLS playlist rewriting.
//!
//! # Data Flow
//! ```text
//! playlist bytes ─► UTF-8 check ─► ManifestDocument (classified lines)
//!                                    │
//!                                    ├─ Blank / Tag ─────────► copied verbatim
//!                                    ├─ UriTag ─► URI="..." ─► resolve ─► codec::encode
//!                                    └─ Uri ────────────────► resolve ─► codec::encode
//! ```
//!
//! # Design Decisions
//! - Purely textual and line oriented; no I/O, no segment parsing
//! - Line order, terminators and the trailing newline are preserved
//! - Absolute references are embedded exactly as written

pub mod document;
pub mod line;
pub mod resolve;
pub mod rewrite;

pub use document::{ManifestDocument, ManifestLine, UriReference};
pub use line::{classify, LineKind, UriTag};
pub use resolve::resolve;
pub use rewrite::{rewrite, RewriteError, Rewriter, Rewritten};

/// Content type served for rewritten playlists.
pub const HLS_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

const HLS_MIME_TYPES: [&str; 4] = [
    "application/vnd.apple.mpegurl",
    "application/x-mpegurl",
    "audio/mpegurl",
    "audio/x-mpegurl",
];

/// True when an origin `Content-Type` names an HLS playlist. Parameters such
/// as `charset` are ignored.
pub fn is_hls_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    HLS_MIME_TYPES.contains(&essence.as_str())
}
