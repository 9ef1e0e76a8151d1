//! Deciding how a target is served before anything is fetched.

use crate::codec::{ForcedKind, ProxyRequest};

/// Route chosen from the request alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetClass {
    /// Fetch with GET and rewrite.
    Manifest,
    /// Hand to the FTP adapter and stream the result.
    Ftp,
    /// Stream without looking at the content type.
    File,
    /// Fetch first, then decide from the origin `Content-Type`.
    Probe,
}

/// First match wins: explicit `type=`, `.m3u8` path, FTP scheme.
pub fn classify_target(request: &ProxyRequest) -> TargetClass {
    let is_ftp = matches!(request.target.scheme(), "ftp" | "ftps");

    match request.kind {
        Some(ForcedKind::Manifest) => return TargetClass::Manifest,
        Some(ForcedKind::File) if is_ftp => return TargetClass::Ftp,
        Some(ForcedKind::File) => return TargetClass::File,
        None => {}
    }

    if request.target.path().to_ascii_lowercase().ends_with(".m3u8") {
        TargetClass::Manifest
    } else if is_ftp {
        TargetClass::Ftp
    } else {
        TargetClass::Probe
    }
}
