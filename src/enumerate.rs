use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{ensure, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, warn};

use crate::course::RawCourse;
use crate::extract::extract;
use crate::fetch::{CourseSource, FetchError};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
}

#[derive(Debug, Clone)]
pub struct EnumerateOptions {
    /// Pause before every identifier that is a nonzero multiple of this.
    pub throttle_every: u32,
    pub throttle: Duration,
    /// Requests in flight at once; 1 means strictly sequential.
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScrapeStats {
    pub probed: usize,
    pub accepted: usize,
    pub empty: usize,
    pub failed: usize,
}

enum Probe {
    Accepted(RawCourse),
    Empty,
    Failed,
}

const MAX_BACKOFF: Duration = Duration::from_secs(60);

fn should_throttle(id: u32, every: u32) -> bool {
    every != 0 && id != 0 && id % every == 0
}

/// Probe every identifier in `range` and return the accepted courses in ID order.
///
/// Identifiers are dispatched in increasing order. With `concurrency > 1` results
/// arrive out of order and are merged by ID, so the output matches a sequential run.
pub async fn enumerate<S>(
    source: Arc<S>,
    range: Range<u32>,
    opts: &EnumerateOptions,
) -> Result<(Vec<RawCourse>, ScrapeStats)>
where
    S: CourseSource + 'static,
{
    ensure!(
        range.start <= range.end,
        "invalid range: start {} is past end {}",
        range.start,
        range.end
    );
    let total = range.len();
    let concurrency = opts.concurrency.max(1);
    info!("Probing {} course numbers [{}, {})", total, range.start, range.end);

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let (tx, mut rx) = mpsc::channel::<(u32, Probe)>(concurrency * 2);

    // Dispatcher: owns the throttle. The pause runs while holding a permit, so in
    // sequential mode it starts only after the previous request has finished.
    let ids = range.clone();
    let dispatcher = {
        let opts = opts.clone();
        tokio::spawn(async move {
            for id in range {
                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    break;
                };
                if should_throttle(id, opts.throttle_every) {
                    info!("Reached course number {}, pausing {:?}", id, opts.throttle);
                    tokio::time::sleep(opts.throttle).await;
                }
                let source = Arc::clone(&source);
                let tx = tx.clone();
                let retry = opts.retry;
                tokio::spawn(async move {
                    let probe = probe(source.as_ref(), id, &retry).await;
                    if tx.send((id, probe)).await.is_err() {
                        warn!("course {}: result dropped, collector is gone", id);
                    }
                    drop(permit);
                });
            }
        })
    };

    let mut accepted = BTreeMap::new();
    let mut seen = BTreeSet::new();
    let mut stats = ScrapeStats::default();
    while let Some((id, probe)) = rx.recv().await {
        seen.insert(id);
        stats.probed += 1;
        match probe {
            Probe::Accepted(course) => {
                accepted.insert(id, course);
            }
            Probe::Empty => stats.empty += 1,
            Probe::Failed => stats.failed += 1,
        }
        pb.inc(1);
    }

    // A worker that died before reporting is counted as failed.
    for id in ids.filter(|id| !seen.contains(id)) {
        error!("course {}: worker exited without a result", id);
        stats.probed += 1;
        stats.failed += 1;
    }
    dispatcher.await?;
    pb.finish_and_clear();

    stats.accepted = accepted.len();
    info!(
        "Done: probed {} ({} courses, {} empty, {} failed)",
        stats.probed, stats.accepted, stats.empty, stats.failed
    );
    Ok((accepted.into_values().collect(), stats))
}

async fn probe<S: CourseSource + ?Sized>(source: &S, id: u32, retry: &RetryPolicy) -> Probe {
    match fetch_with_retry(source, id, retry).await {
        Ok(body) => match extract(&body).into_course(id) {
            Some(course) => Probe::Accepted(course),
            None => Probe::Empty,
        },
        Err(e) => {
            warn!("course {}: {}", id, e);
            Probe::Failed
        }
    }
}

async fn fetch_with_retry<S: CourseSource + ?Sized>(
    source: &S,
    id: u32,
    retry: &RetryPolicy,
) -> Result<String, FetchError> {
    let mut attempt = 0;
    loop {
        match source.fetch(id).await {
            Ok(body) => return Ok(body),
            Err(e) if e.is_retryable() && attempt < retry.max_retries => {
                let backoff = backoff_delay(retry, attempt);
                warn!(
                    "course {}: {} (attempt {}/{}), backing off {:.1}s",
                    id,
                    e,
                    attempt + 1,
                    retry.max_retries,
                    backoff.as_secs_f64()
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// `base * 2^attempt`, capped at a minute.
fn backoff_delay(retry: &RetryPolicy, attempt: u32) -> Duration {
    retry
        .base_backoff
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(MAX_BACKOFF)
}
