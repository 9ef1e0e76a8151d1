//! Line classification for HLS playlists.

use std::ops::Range;

/// Tags that carry a `URI="..."` attribute pointing at another resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriTag {
    Key,
    SessionKey,
    Media,
    Map,
    IFrameStreamInf,
    Part,
    PreloadHint,
    RenditionReport,
    SessionData,
}

impl UriTag {
    pub const ALL: [UriTag; 9] = [
        UriTag::Key,
        UriTag::SessionKey,
        UriTag::Media,
        UriTag::Map,
        UriTag::IFrameStreamInf,
        UriTag::Part,
        UriTag::PreloadHint,
        UriTag::RenditionReport,
        UriTag::SessionData,
    ];

    /// Tag name without the leading `#`.
    pub fn name(&self) -> &'static str {
        match self {
            UriTag::Key => "EXT-X-KEY",
            UriTag::SessionKey => "EXT-X-SESSION-KEY",
            UriTag::Media => "EXT-X-MEDIA",
            UriTag::Map => "EXT-X-MAP",
            UriTag::IFrameStreamInf => "EXT-X-I-FRAME-STREAM-INF",
            UriTag::Part => "EXT-X-PART",
            UriTag::PreloadHint => "EXT-X-PRELOAD-HINT",
            UriTag::RenditionReport => "EXT-X-RENDITION-REPORT",
            UriTag::SessionData => "EXT-X-SESSION-DATA",
        }
    }
}

/// What a single playlist line is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Empty or whitespace only.
    Blank,
    /// Comment or tag copied verbatim.
    Tag,
    /// Tag whose `URI` attribute is rewritten.
    UriTag(UriTag),
    /// Media segment or sub-playlist reference.
    Uri,
}

/// Classify one line (without its terminator).
pub fn classify(line: &str) -> LineKind {
    let trimmed = line.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }

    let Some(tag) = trimmed.strip_prefix('#') else {
        return LineKind::Uri;
    };

    UriTag::ALL
        .into_iter()
        .find(|candidate| {
            tag.strip_prefix(candidate.name())
                .is_some_and(|rest| rest.starts_with(':'))
        })
        .map_or(LineKind::Tag, LineKind::UriTag)
}

/// Byte range of the quoted `URI` attribute value in a tag line.
///
/// Attributes are scanned in order; commas and `URI=` text inside other
/// quoted values are ignored.
pub fn uri_attribute_span(line: &str) -> Option<Range<usize>> {
    let list_start = line.find(':')? + 1;
    let bytes = line.as_bytes();
    let mut attr_start = list_start;
    let mut in_quotes = false;

    for i in list_start..=bytes.len() {
        if i == attr_start && !in_quotes {
            let rest = &line[attr_start..];
            let trimmed = rest.trim_start();
            if trimmed.starts_with("URI=\"") {
                let value_start = attr_start + (rest.len() - trimmed.len()) + 5;
                let value_len = line[value_start..].find('"')?;
                return Some(value_start..value_start + value_len);
            }
        }
        match bytes.get(i) {
            Some(b'"') => in_quotes = !in_quotes,
            Some(b',') if !in_quotes => attr_start = i + 1,
            _ => {}
        }
    }
    None
}

/// Byte range of the reference token on a URI line, excluding surrounding
/// whitespace.
pub fn token_span(line: &str) -> Range<usize> {
    let without_bom = line.trim_start_matches('\u{feff}');
    let start_trimmed = without_bom.trim_start();
    let start = line.len() - start_trimmed.len();
    start..start + start_trimmed.trim_end().len()
}
