//! Duplicate suppression: once on raw input before fan-out, once on
//! resolved identity before emission. Both seen-sets are owned by the
//! coordinating task only; workers never touch them.

use std::collections::HashSet;

use ytdlp_resolver::ResolvedRecord;

/// First-seen-wins filter over raw input lines, keyed on the
/// trimmed-lowercased line. Returns the survivors in original order and
/// the skipped duplicates for non-fatal reporting.
pub fn dedupe_input_lines(lines: &[String]) -> (Vec<String>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    let mut skipped = Vec::new();
    for line in lines {
        let key = line.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        if seen.insert(key) {
            unique.push(line.clone());
        } else {
            skipped.push(line.clone());
        }
    }
    (unique, skipped)
}

/// Why a buffered record was withheld from the playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Nothing to emit.
    NoEndpoint,
    /// The special entry already lists this endpoint.
    MatchesSpecial,
    /// Endpoint or identity key was already emitted in this run.
    Duplicate,
}

/// Post-fetch filter: admits each record at most once per endpoint and per
/// identity key, and never the endpoint the special entry claimed.
#[derive(Debug, Default)]
pub struct EmittedKeys {
    special_url: Option<String>,
    urls: HashSet<String>,
    identities: HashSet<String>,
}

impl EmittedKeys {
    pub fn new(special_url: Option<String>) -> Self {
        Self {
            special_url,
            ..Self::default()
        }
    }

    /// Decides whether `record` may be emitted. On admission the record's
    /// keys are recorded and its endpoint returned; first seen wins.
    pub fn admit(&mut self, record: &ResolvedRecord) -> Result<String, Rejection> {
        let Some(url) = record.stream_url.as_deref() else {
            return Err(Rejection::NoEndpoint);
        };
        if self.special_url.as_deref() == Some(url) {
            return Err(Rejection::MatchesSpecial);
        }
        let identity = record.identity_key();
        if self.urls.contains(url)
            || identity
                .as_ref()
                .is_some_and(|key| self.identities.contains(key))
        {
            return Err(Rejection::Duplicate);
        }
        self.urls.insert(url.to_string());
        if let Some(key) = identity {
            self.identities.insert(key);
        }
        Ok(url.to_string())
    }
}
