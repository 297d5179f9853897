//! Bounded-parallelism resolution of every deduplicated input line.

use colored::Colorize;
use indicatif::ProgressBar;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::error;

use ytdlp_resolver::{ResolveOptions, ResolvedRecord, ResolverClient, resolve_reference};

/// Resolves all `lines` under a fixed-size worker pool.
///
/// Results are collected as workers complete, in no particular order, and
/// the returned buffer is re-ordered to the stable input sequence so
/// emission stays deterministic. A worker that fails unexpectedly is
/// reported on the progress channel and dropped; it never aborts siblings.
/// Returns once every submitted line has completed or been caught.
pub async fn run_batch(
    lines: &[String],
    client: Arc<ResolverClient>,
    opts: Arc<ResolveOptions>,
    workers: usize,
    progress: &ProgressBar,
) -> Vec<ResolvedRecord> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();

    for (index, line) in lines.iter().enumerate() {
        let semaphore = semaphore.clone();
        let client = client.clone();
        let opts = opts.clone();
        let line = line.clone();
        tasks.spawn(async move {
            // Acquired inside the task so submission never blocks; the
            // permit count bounds how many resolver calls are in flight.
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("resolution semaphore is never closed");
            (index, resolve_reference(&line, &client, &opts).await)
        });
    }

    let mut slots: Vec<Option<ResolvedRecord>> = vec![None; lines.len()];
    while let Some(joined) = tasks.join_next().await {
        progress.inc(1);
        match joined {
            Ok((index, record)) => {
                progress.println(format!("Checked {}", record.input));
                slots[index] = Some(record);
            }
            Err(e) => {
                error!(error = %e, "resolution task failed");
                progress.println(format!("Resolution task failed: {e}").red().to_string());
            }
        }
    }
    slots.into_iter().flatten().collect()
}
