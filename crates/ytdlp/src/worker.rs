//! Resolution of a single reference: normalization, metadata, endpoint,
//! expiry.

use tracing::debug;

use crate::client::ResolverClient;
use crate::normalize::normalize_reference;
use crate::record::{ResolvedRecord, expire_epoch_from_url};

/// Per-run resolution knobs, immutable for the whole run.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Skip the metadata round trip entirely.
    pub skip_metadata: bool,
    /// When endpoint resolution fails, fall back to the canonical
    /// reference itself so the item still yields an emittable endpoint.
    pub fallback_to_reference: bool,
    /// Format selector handed to the quality-specific endpoint strategy.
    pub format_selector: String,
}

/// Resolves one raw input line into a record.
///
/// Infallible by contract: every failure path degrades to absent fields so
/// a single bad reference can never abort a batch. Holds no shared state
/// and is safe for unbounded parallel invocation.
pub async fn resolve_reference(
    raw_line: &str,
    client: &ResolverClient,
    opts: &ResolveOptions,
) -> ResolvedRecord {
    let line = raw_line.trim();
    if line.is_empty() {
        return ResolvedRecord::default();
    }
    let watch_url = normalize_reference(line);
    let mut record = ResolvedRecord::empty(line);

    if !opts.skip_metadata {
        match client.fetch_minimal_metadata(&watch_url).await {
            Ok(meta) => {
                record.id = meta.id;
                record.title = meta.title;
                record.thumbnail = meta.thumbnail;
            }
            Err(e) => debug!(reference = line, error = %e, "metadata fetch failed"),
        }
    }

    let stream_url = match client
        .fetch_stream_endpoint(&watch_url, &opts.format_selector)
        .await
    {
        Ok(url) => url,
        Err(e) => {
            debug!(reference = line, error = %e, "endpoint resolution failed");
            None
        }
    };
    record.stream_url = stream_url.or_else(|| opts.fallback_to_reference.then(|| watch_url.clone()));
    record.expire_epoch = record.stream_url.as_deref().and_then(expire_epoch_from_url);
    record
}
