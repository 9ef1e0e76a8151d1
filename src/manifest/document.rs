//! Parsed view of a playlist that borrows from the source text.

use std::ops::Range;

use url::Url;

use crate::manifest::line::{classify, token_span, uri_attribute_span, LineKind};
use crate::manifest::resolve::resolve;

/// A reference found on a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriReference<'a> {
    /// Byte range of the token within the line content.
    pub span: Range<usize>,
    pub raw: &'a str,
    /// Absolute form, or `None` when the token cannot be resolved.
    pub resolved: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestLine<'a> {
    pub kind: LineKind,
    /// Line text without its terminator.
    pub content: &'a str,
    /// `"\n"`, `"\r\n"`, or `""` for a final line without newline.
    pub terminator: &'a str,
    pub uri: Option<UriReference<'a>>,
}

/// Ordered lines of a playlist. Concatenating every line's content and
/// terminator reproduces the input exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDocument<'a> {
    lines: Vec<ManifestLine<'a>>,
}

impl<'a> ManifestDocument<'a> {
    pub fn parse(text: &'a str, base: &Url) -> Self {
        let lines = text
            .split_inclusive('\n')
            .map(|piece| parse_line(piece, base))
            .collect();
        Self { lines }
    }

    pub fn lines(&self) -> &[ManifestLine<'a>] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn uri_count(&self) -> usize {
        self.lines.iter().filter(|line| line.uri.is_some()).count()
    }
}

fn parse_line<'a>(piece: &'a str, base: &Url) -> ManifestLine<'a> {
    let (content, terminator) = if let Some(content) = piece.strip_suffix("\r\n") {
        (content, &piece[content.len()..])
    } else if let Some(content) = piece.strip_suffix('\n') {
        (content, &piece[content.len()..])
    } else {
        (piece, "")
    };

    let kind = classify(content);
    let span = match kind {
        LineKind::Uri => Some(token_span(content)),
        LineKind::UriTag(_) => uri_attribute_span(content),
        LineKind::Blank | LineKind::Tag => None,
    };

    let uri = span.map(|span| {
        let raw = &content[span.clone()];
        UriReference {
            span,
            raw,
            resolved: resolve(base, raw),
        }
    });

    ManifestLine {
        kind,
        content,
        terminator,
        uri,
    }
}
