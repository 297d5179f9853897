//! Resolver client: per-call timeout and retry around the backend, plus the
//! two fetch operations the resolution pipeline needs.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::{ResolverBackend, ResolverOutput};
use crate::error::ResolverError;

/// Compact output template for the metadata round trip. Fields are
/// TAB-separated so titles containing spaces survive splitting.
const META_PRINT_TEMPLATE: &str = "%(id)s\t%(title)s\t%(thumbnail)s";
const META_FIELD_DELIMITER: char = '\t';

/// Linear retry behavior: the delay before attempt `n` is `backoff * n`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub retries: u32,
    /// Base delay multiplied by the attempt number.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            backoff: Duration::from_millis(1500),
        }
    }
}

impl RetryPolicy {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

/// Identifier, title and thumbnail of one reference, any of which the
/// resolver may not know.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MinimalMeta {
    pub id: Option<String>,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
}

impl MinimalMeta {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.title.is_none() && self.thumbnail.is_none()
    }
}

/// Ordered endpoint-resolution strategies, tried until one yields a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndpointStrategy {
    /// `-g <url>`: default-format direct URL.
    DirectDefault,
    /// `-f <selector> -g <url>`: direct URL for the configured format.
    DirectWithFormat,
    /// `-j <url>`: full metadata JSON, scanned for any usable URL.
    MetadataJson,
}

const ENDPOINT_STRATEGIES: [EndpointStrategy; 3] = [
    EndpointStrategy::DirectDefault,
    EndpointStrategy::DirectWithFormat,
    EndpointStrategy::MetadataJson,
];

impl EndpointStrategy {
    /// Operation arguments for this strategy, or `None` when it does not
    /// apply (no format selector configured).
    fn args(self, url: &str, format_selector: &str) -> Option<Vec<String>> {
        match self {
            EndpointStrategy::DirectDefault => {
                Some(vec!["-g".to_string(), url.to_string()])
            }
            EndpointStrategy::DirectWithFormat => {
                if format_selector.is_empty() {
                    return None;
                }
                Some(vec![
                    "-f".to_string(),
                    format_selector.to_string(),
                    "-g".to_string(),
                    url.to_string(),
                ])
            }
            EndpointStrategy::MetadataJson => {
                Some(vec!["-j".to_string(), url.to_string()])
            }
        }
    }

    /// Extracts a URL from the captured output, if this strategy found one.
    fn parse(self, text: &str) -> Option<String> {
        match self {
            EndpointStrategy::DirectDefault | EndpointStrategy::DirectWithFormat => {
                first_http_line(text)
            }
            EndpointStrategy::MetadataJson => scan_formats_json(text),
        }
    }
}

/// Wraps the opaque resolver capability with a per-call timeout and linear
/// retry/backoff. Both fetch operations are independently retryable and
/// safe to call concurrently.
pub struct ResolverClient {
    backend: Arc<dyn ResolverBackend>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl ResolverClient {
    pub fn new(backend: Arc<dyn ResolverBackend>, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            backend,
            timeout,
            retry,
        }
    }

    /// Requests id/title/thumbnail in one round trip. Absent or empty
    /// fields come back as `None`; only transport failure after exhausting
    /// retries is an error.
    pub async fn fetch_minimal_metadata(&self, url: &str) -> Result<MinimalMeta, ResolverError> {
        let args = vec![
            "--print".to_string(),
            META_PRINT_TEMPLATE.to_string(),
            url.to_string(),
        ];
        let output = self.run_with_retries(&args).await?;
        Ok(parse_minimal_meta(output.text()))
    }

    /// Resolves a playable stream URL by trying each strategy in order and
    /// returning the first hit. `Ok(None)` means every strategy ran but
    /// found nothing; `Err` means every applicable strategy failed at the
    /// transport level.
    pub async fn fetch_stream_endpoint(
        &self,
        url: &str,
        format_selector: &str,
    ) -> Result<Option<String>, ResolverError> {
        let mut last_err = None;
        let mut any_ran = false;

        for strategy in ENDPOINT_STRATEGIES {
            let Some(args) = strategy.args(url, format_selector) else {
                continue;
            };
            match self.run_with_retries(&args).await {
                Ok(output) => {
                    any_ran = true;
                    if let Some(found) = strategy.parse(output.text()) {
                        return Ok(Some(found));
                    }
                }
                Err(e) => {
                    debug!(url, ?strategy, error = %e, "endpoint strategy failed");
                    last_err = Some(e);
                }
            }
        }

        match last_err {
            Some(e) if !any_ran => Err(e),
            _ => Ok(None),
        }
    }

    async fn run_with_retries(&self, args: &[String]) -> Result<ResolverOutput, ResolverError> {
        let mut attempt = 0u32;
        loop {
            let call = tokio::time::timeout(self.timeout, self.backend.run(args)).await;
            let err = match call {
                Ok(Ok(output)) => return Ok(output),
                Ok(Err(e)) => e,
                Err(_) => ResolverError::Timeout(self.timeout),
            };

            attempt += 1;
            if attempt > self.retry.retries {
                return Err(err);
            }
            let delay = self.retry.delay_for_attempt(attempt);
            warn!(
                attempt,
                max = self.retry.retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying resolver call after transient failure"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// First line of `text` that looks like an absolute HTTP(S) URL.
fn first_http_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|l| l.starts_with("http://") || l.starts_with("https://"))
        .map(ToOwned::to_owned)
}

fn parse_minimal_meta(text: &str) -> MinimalMeta {
    let Some(first) = text.lines().find(|l| !l.trim().is_empty()) else {
        return MinimalMeta::default();
    };
    let mut parts = first.split(META_FIELD_DELIMITER);
    let mut field = || {
        parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
    };
    MinimalMeta {
        id: field(),
        title: field(),
        thumbnail: field(),
    }
}

/// Scans a full-metadata JSON document for a usable stream URL: the
/// top-level `url`, then each `requested_formats` entry, then `formats`
/// preferring segmented/manifest entries, else the first format with a URL.
fn scan_formats_json(text: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(text).ok()?;
    let obj = parsed.as_object()?;

    if let Some(url) = nonempty_str(obj.get("url")) {
        return Some(url.to_string());
    }

    if let Some(requested) = obj.get("requested_formats").and_then(Value::as_array) {
        for format in requested {
            if let Some(url) = nonempty_str(format.get("url")) {
                return Some(url.to_string());
            }
        }
    }

    let formats = obj.get("formats").and_then(Value::as_array)?;
    for format in formats {
        let ext = nonempty_str(format.get("ext")).unwrap_or("");
        let protocol = nonempty_str(format.get("protocol")).unwrap_or("");
        if let Some(url) = nonempty_str(format.get("url"))
            && (ext.contains("m3u8") || protocol.contains("m3u8"))
        {
            return Some(url.to_string());
        }
    }
    formats
        .iter()
        .find_map(|f| nonempty_str(f.get("url")))
        .map(ToOwned::to_owned)
}

fn nonempty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn out(stdout: &str) -> ResolverOutput {
        ResolverOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
            success: true,
        }
    }

    /// Backend scripted by a closure over the operation arguments.
    struct FnBackend<F>(F);

    #[async_trait]
    impl<F> ResolverBackend for FnBackend<F>
    where
        F: Fn(&[String]) -> Result<ResolverOutput, ResolverError> + Send + Sync,
    {
        async fn run(&self, args: &[String]) -> Result<ResolverOutput, ResolverError> {
            (self.0)(args)
        }
    }

    /// Backend that never completes, to exercise the timeout path.
    struct StallingBackend {
        calls: AtomicU32,
    }

    #[async_trait]
    impl ResolverBackend for StallingBackend {
        async fn run(&self, _args: &[String]) -> Result<ResolverOutput, ResolverError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(ResolverOutput::default())
        }
    }

    fn client_with<F>(f: F) -> ResolverClient
    where
        F: Fn(&[String]) -> Result<ResolverOutput, ResolverError> + Send + Sync + 'static,
    {
        ResolverClient::new(
            Arc::new(FnBackend(f)),
            Duration::from_millis(200),
            RetryPolicy {
                retries: 0,
                backoff: Duration::from_millis(1),
            },
        )
    }

    #[test]
    fn minimal_meta_parses_all_fields() {
        let meta = parse_minimal_meta("vid1\tA Title\thttps://img/1.jpg");
        assert_eq!(meta.id.as_deref(), Some("vid1"));
        assert_eq!(meta.title.as_deref(), Some("A Title"));
        assert_eq!(meta.thumbnail.as_deref(), Some("https://img/1.jpg"));
    }

    #[test]
    fn minimal_meta_tolerates_missing_trailing_fields() {
        let meta = parse_minimal_meta("vid1\tA Title");
        assert_eq!(meta.id.as_deref(), Some("vid1"));
        assert_eq!(meta.title.as_deref(), Some("A Title"));
        assert_eq!(meta.thumbnail, None);

        let meta = parse_minimal_meta("vid1");
        assert_eq!(meta.id.as_deref(), Some("vid1"));
        assert_eq!(meta.title, None);
    }

    #[test]
    fn minimal_meta_treats_blank_fields_as_absent() {
        let meta = parse_minimal_meta("vid1\t \thttps://img/1.jpg");
        assert_eq!(meta.title, None);
        assert_eq!(meta.thumbnail.as_deref(), Some("https://img/1.jpg"));
    }

    #[test]
    fn minimal_meta_empty_output_is_all_absent() {
        assert!(parse_minimal_meta("").is_empty());
        assert!(parse_minimal_meta("\n  \n").is_empty());
    }

    #[test]
    fn minimal_meta_uses_first_nonempty_line() {
        let meta = parse_minimal_meta("\nvid1\tTitle\nvid2\tOther");
        assert_eq!(meta.id.as_deref(), Some("vid1"));
    }

    #[tokio::test]
    async fn endpoint_uses_default_direct_url_first() {
        let client = client_with(|args| {
            assert_eq!(args[0], "-g");
            Ok(out("https://cdn.example/stream.m3u8\n"))
        });
        let url = client
            .fetch_stream_endpoint("https://w", "worstvideo+bestaudio/best")
            .await
            .unwrap();
        assert_eq!(url.as_deref(), Some("https://cdn.example/stream.m3u8"));
    }

    #[tokio::test]
    async fn endpoint_falls_back_to_format_strategy() {
        let client = client_with(|args| match args[0].as_str() {
            "-g" => Ok(out("no url here")),
            "-f" => {
                assert_eq!(args[1], "best");
                Ok(out("https://cdn.example/direct.mp4"))
            }
            other => panic!("unexpected op {other}"),
        });
        let url = client.fetch_stream_endpoint("https://w", "best").await.unwrap();
        assert_eq!(url.as_deref(), Some("https://cdn.example/direct.mp4"));
    }

    #[tokio::test]
    async fn endpoint_skips_format_strategy_without_selector() {
        let client = client_with(|args| {
            assert_ne!(args[0], "-f");
            Ok(out(""))
        });
        let url = client.fetch_stream_endpoint("https://w", "").await.unwrap();
        assert_eq!(url, None);
    }

    #[tokio::test]
    async fn endpoint_json_scan_prefers_top_level_url() {
        let client = client_with(|args| match args[0].as_str() {
            "-j" => Ok(out(r#"{"url": "https://cdn/top", "formats": []}"#)),
            _ => Ok(out("")),
        });
        let url = client.fetch_stream_endpoint("https://w", "best").await.unwrap();
        assert_eq!(url.as_deref(), Some("https://cdn/top"));
    }

    #[test]
    fn json_scan_walks_requested_formats() {
        let doc = r#"{
            "requested_formats": [{"acodec": "opus"}, {"url": "https://cdn/req"}],
            "formats": [{"url": "https://cdn/other"}]
        }"#;
        assert_eq!(scan_formats_json(doc).as_deref(), Some("https://cdn/req"));
    }

    #[test]
    fn json_scan_prefers_manifest_formats() {
        let doc = r#"{"formats": [
            {"url": "https://cdn/a.mp4", "ext": "mp4", "protocol": "https"},
            {"url": "https://cdn/b", "ext": "mp4", "protocol": "m3u8_native"}
        ]}"#;
        assert_eq!(scan_formats_json(doc).as_deref(), Some("https://cdn/b"));
    }

    #[test]
    fn json_scan_falls_back_to_first_format_url() {
        let doc = r#"{"formats": [
            {"ext": "mp4"},
            {"url": "https://cdn/first", "ext": "mp4"},
            {"url": "https://cdn/second", "ext": "mp4"}
        ]}"#;
        assert_eq!(scan_formats_json(doc).as_deref(), Some("https://cdn/first"));
    }

    #[test]
    fn json_scan_rejects_garbage() {
        assert_eq!(scan_formats_json("not json"), None);
        assert_eq!(scan_formats_json(r#"["array"]"#), None);
        assert_eq!(scan_formats_json(r#"{"formats": []}"#), None);
    }

    #[tokio::test]
    async fn endpoint_exhausting_all_strategies_is_none() {
        let client = client_with(|_| Ok(out("nothing useful")));
        let url = client.fetch_stream_endpoint("https://w", "best").await.unwrap();
        assert_eq!(url, None);
    }

    #[tokio::test]
    async fn endpoint_propagates_error_when_no_strategy_ran() {
        let client = client_with(|_| Err(ResolverError::Other("boom".to_string())));
        let err = client
            .fetch_stream_endpoint("https://w", "best")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolverError::Other(_)));
    }

    #[tokio::test]
    async fn endpoint_tolerates_partial_strategy_failure() {
        // Direct strategies fail at the transport level but the JSON
        // strategy still runs and wins.
        let client = client_with(|args| match args[0].as_str() {
            "-j" => Ok(out(r#"{"url": "https://cdn/rescued"}"#)),
            _ => Err(ResolverError::Other("transient".to_string())),
        });
        let url = client.fetch_stream_endpoint("https://w", "best").await.unwrap();
        assert_eq!(url.as_deref(), Some("https://cdn/rescued"));
    }

    #[tokio::test]
    async fn nonzero_exit_output_is_still_parsed() {
        let client = client_with(|_| {
            Ok(ResolverOutput {
                stdout: String::new(),
                stderr: "https://cdn/from-stderr".to_string(),
                success: false,
            })
        });
        let url = client.fetch_stream_endpoint("https://w", "").await.unwrap();
        assert_eq!(url.as_deref(), Some("https://cdn/from-stderr"));
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let backend = FnBackend(move |_args: &[String]| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ResolverError::Other("flaky".to_string()))
            } else {
                Ok(out("vid1\tTitle"))
            }
        });
        let client = ResolverClient::new(
            Arc::new(backend),
            Duration::from_millis(200),
            RetryPolicy {
                retries: 2,
                backoff: Duration::from_millis(1),
            },
        );
        let meta = client.fetch_minimal_metadata("https://w").await.unwrap();
        assert_eq!(meta.id.as_deref(), Some("vid1"));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn timeout_exhausts_retries_and_propagates() {
        let backend = Arc::new(StallingBackend {
            calls: AtomicU32::new(0),
        });
        let client = ResolverClient::new(
            backend.clone(),
            Duration::from_millis(20),
            RetryPolicy {
                retries: 2,
                backoff: Duration::from_millis(1),
            },
        );
        let err = client.fetch_minimal_metadata("https://w").await.unwrap_err();
        assert!(matches!(err, ResolverError::Timeout(_)));
        // Initial attempt plus two retries.
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn retry_delay_is_linear() {
        let policy = RetryPolicy {
            retries: 3,
            backoff: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(300));
    }
}
