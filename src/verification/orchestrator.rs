//! Bounded, deadline-governed fan-out of candidate verification.

use super::prober::DeliverabilityProber;
use crate::core::models::{CandidateEmail, VerificationReport, VerificationResult};
use crate::utils::cache::DomainCache;

use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Stand-in expiry for deadlines too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Probes every candidate with at most `max_concurrency` probes in flight.
///
/// Returns once all candidates are probed or `deadline` elapses, whichever
/// comes first. On expiry outstanding tasks are aborted and their candidates
/// are absent from the report. A fresh [`DomainCache`] is used for the call.
pub(crate) async fn verify_candidates(
    prober: Arc<DeliverabilityProber>,
    candidates: Vec<CandidateEmail>,
    max_concurrency: usize,
    deadline: Duration,
) -> VerificationReport {
    let started = Instant::now();
    let now = tokio::time::Instant::now();
    let expires_at = now
        .checked_add(deadline)
        .unwrap_or_else(|| now + FAR_FUTURE);
    let cache = Arc::new(DomainCache::new());
    let max_concurrency = max_concurrency.max(1);
    let total = candidates.len();

    let mut pending = candidates.into_iter();
    let mut tasks: FuturesUnordered<JoinHandle<VerificationResult>> = FuturesUnordered::new();
    let mut results = Vec::with_capacity(total);
    let mut timed_out = false;

    tracing::debug!(target: "orchestrator",
        "Verifying {} candidates (concurrency {}, deadline {:?})", total, max_concurrency, deadline);

    loop {
        while tasks.len() < max_concurrency {
            let Some(candidate) = pending.next() else {
                break;
            };
            let prober = Arc::clone(&prober);
            let cache = Arc::clone(&cache);
            tasks.push(tokio::spawn(async move {
                prober.probe(&cache, candidate).await
            }));
        }

        if tasks.is_empty() {
            break;
        }

        match tokio::time::timeout_at(expires_at, tasks.next()).await {
            Ok(Some(Ok(result))) => {
                tracing::trace!(target: "orchestrator",
                    "{} -> {} ({})", result.candidate(), result.method(), result.detail());
                results.push(result);
            }
            Ok(Some(Err(join_error))) => {
                tracing::error!(target: "orchestrator", "A verification task failed to join: {}", join_error);
            }
            Ok(None) => break,
            Err(_) => {
                timed_out = true;
                break;
            }
        }
    }

    if timed_out {
        tracing::warn!(target: "orchestrator",
            "Deadline of {:?} reached with {} of {} candidates verified; aborting {} in-flight probes.",
            deadline, results.len(), total, tasks.len());
        for task in tasks.iter() {
            task.abort();
        }
    }

    results.sort_by_key(|r| r.candidate().order);
    tracing::debug!(target: "orchestrator",
        "Verified {} of {} candidates across {} domains in {:?}",
        results.len(), total, cache.len(), started.elapsed());

    VerificationReport {
        results,
        verdicts: cache.snapshot(),
        timed_out,
        elapsed: started.elapsed(),
    }
}
