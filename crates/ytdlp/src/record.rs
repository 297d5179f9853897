//! The per-reference resolution result and endpoint inspection helpers.

use regex::Regex;
use std::sync::LazyLock;

/// Expiry epoch embedded in some resolved endpoints as an
/// `expire/<digits>` path segment.
static EXPIRE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)expire/(\d+)").expect("valid expire pattern"));

/// Outcome of resolving one reference. Built once by the resolution worker
/// and immutable afterwards; every field except the raw input is optional
/// because each resolution step may fail without failing the item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRecord {
    /// The raw input line, as supplied by the user.
    pub input: String,
    /// Identifier reported by the resolver.
    pub id: Option<String>,
    /// Display title reported by the resolver.
    pub title: Option<String>,
    /// Thumbnail/logo URL reported by the resolver.
    pub thumbnail: Option<String>,
    /// Playable stream endpoint, possibly the canonical reference itself
    /// when fallback is enabled.
    pub stream_url: Option<String>,
    /// Expiry epoch seconds extracted from the stream endpoint.
    pub expire_epoch: Option<i64>,
}

impl ResolvedRecord {
    pub fn empty(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    /// Title to display: the resolved title when present, the raw input
    /// line otherwise.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.input)
    }

    /// Identity key for duplicate detection: id, else title, else the raw
    /// input line, lowercased. `None` when all of those are blank.
    pub fn identity_key(&self) -> Option<String> {
        let key = self
            .id
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or(&self.input)
            .trim()
            .to_lowercase();
        if key.is_empty() { None } else { Some(key) }
    }
}

/// Extracts the expiry epoch from a stream URL. Absent or unparsable
/// digits yield `None`, never an error.
pub fn expire_epoch_from_url(url: &str) -> Option<i64> {
    EXPIRE_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Whether a URL looks like a segmented/manifest stream.
pub fn is_manifest_url(url: &str) -> bool {
    let u = url.to_lowercase();
    u.contains(".m3u8") || u.contains("manifest") || u.contains("hls_playlist")
}
