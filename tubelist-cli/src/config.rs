//! JSON settings, loaded leniently: a missing or unparsable settings file
//! is reported and replaced by the built-in defaults.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use ytdlp_resolver::{ResolveOptions, ResolverAuth, RetryPolicy};

const DEFAULT_FAVICON_SERVICE: &str =
    "https://www.google.com/s2/favicons?domain_url=https://www.youtube.com&sz=128";
const DEFAULT_FORMAT_SELECTOR: &str = "worstvideo+bestaudio/best";

/// Quality value that switches format selection to the custom selector.
const CUSTOM_QUALITY: &str = "custom";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Concurrent resolution workers.
    pub workers: usize,
    /// Per-resolver-call timeout in seconds.
    pub timeout: u64,
    /// Retries after the initial attempt of each resolver call.
    pub retries: u32,
    /// Linear backoff factor between retries, in seconds.
    pub backoff: f64,
    /// Skip the metadata round trip.
    pub no_metadata: bool,
    /// Accepted for compatibility with existing settings files; has no
    /// effect beyond the minimal-metadata path.
    pub full_metadata: bool,
    /// Use the watch URL itself when endpoint resolution fails.
    pub fallback_watch_url: bool,
    /// Accepted but not consulted; duplicate detection always keys on the
    /// resolved identity and stream URL.
    pub dedupe_by: String,
    pub video_quality: String,
    pub audio_quality: String,
    pub quality_custom_format: String,
    /// Logo used for the special entry and for records without a thumbnail.
    pub favicon_service: String,
    /// Cookie file path, forwarded to the resolver.
    pub cookies: Option<String>,
    /// Browser to pull cookies from; ignored when `cookies` is set.
    pub cookies_from_browser: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workers: 6,
            timeout: 60,
            retries: 2,
            backoff: 1.5,
            no_metadata: false,
            full_metadata: false,
            fallback_watch_url: true,
            dedupe_by: "id".to_string(),
            video_quality: "worst".to_string(),
            audio_quality: "best".to_string(),
            quality_custom_format: String::new(),
            favicon_service: DEFAULT_FAVICON_SERVICE.to_string(),
            cookies: None,
            cookies_from_browser: None,
        }
    }
}

impl AppConfig {
    /// Loads settings from `path`. Missing or invalid files are non-fatal:
    /// the defaults apply and the condition is reported to the operator.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "settings file not readable, using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "settings file not parsable, using defaults");
                Self::default()
            }
        }
    }

    /// Format selector handed to the resolver: composed from the
    /// video/audio qualities unless either asks for the custom selector.
    pub fn format_selector(&self) -> String {
        if self.video_quality != CUSTOM_QUALITY && self.audio_quality != CUSTOM_QUALITY {
            format!(
                "{}video+{}audio/best",
                self.video_quality, self.audio_quality
            )
        } else if self.quality_custom_format.is_empty() {
            DEFAULT_FORMAT_SELECTOR.to_string()
        } else {
            self.quality_custom_format.clone()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            backoff: Duration::from_secs_f64(self.backoff.max(0.0)),
        }
    }

    pub fn resolver_auth(&self) -> ResolverAuth {
        ResolverAuth {
            cookies: self.cookies.clone(),
            cookies_from_browser: self.cookies_from_browser.clone(),
        }
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            skip_metadata: self.no_metadata,
            fallback_to_reference: self.fallback_watch_url,
            format_selector: self.format_selector(),
        }
    }
}
