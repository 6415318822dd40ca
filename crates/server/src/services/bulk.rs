//! Batched bulk mutations with per-ID failure tracking.
//!
//! Every bulk endpoint shares this contract: targets are processed in
//! fixed-size batches to bound concurrent load on the database, requests
//! inside a batch run concurrently with no ordering guarantee, and batch
//! N+1 never starts before batch N has fully settled. A single target's
//! failure never aborts its siblings; the caller gets a partition of
//! succeeded and failed IDs with per-ID reasons.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;

/// Batch size used by the bulk endpoints.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// A failed target and why it failed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BulkFailure<Id> {
    pub id: Id,
    pub reason: String,
}

/// Outcome of a bulk operation: every input ID appears exactly once,
/// either in `succeeded` or in `failed`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BulkReport<Id> {
    pub succeeded: Vec<Id>,
    pub failed: Vec<BulkFailure<Id>>,
}

impl<Id> Default for BulkReport<Id> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<Id> BulkReport<Id> {
    /// Total number of targets processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Run `op` over `ids` in batches of `batch_size`.
///
/// Sub-requests within one batch run concurrently (`join_all`); batches
/// run strictly sequentially. Failures are recorded per ID, never
/// propagated.
pub async fn run_batched<Id, F, Fut, E>(ids: &[Id], batch_size: usize, op: F) -> BulkReport<Id>
where
    Id: Copy,
    F: Fn(Id) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let mut report = BulkReport::default();

    for batch in ids.chunks(batch_size.max(1)) {
        let results = join_all(batch.iter().copied().map(&op)).await;
        for (id, result) in batch.iter().copied().zip(results) {
            match result {
                Ok(()) => report.succeeded.push(id),
                Err(e) => report.failed.push(BulkFailure {
                    id,
                    reason: e.to_string(),
                }),
            }
        }
    }

    report
}

/// Retry `op` up to `attempts` times with linearly growing backoff
/// (`base_delay`, then 2x, 3x, ...). Returns the last error when every
/// attempt fails.
pub async fn with_retries<T, E, F, Fut>(
    attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt: u32 = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts.max(1) => return Err(e),
            Err(e) => {
                tracing::warn!(attempt, error = %e, "retrying after failure");
                tokio::time::sleep(base_delay * attempt).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn partition_covers_every_id_exactly_once() {
        let ids: Vec<i32> = (1..=13).collect();
        let report = run_batched(&ids, DEFAULT_BATCH_SIZE, |id| async move {
            if id % 3 == 0 {
                Err(format!("boom {id}"))
            } else {
                Ok(())
            }
        })
        .await;

        let mut seen: Vec<i32> = report.succeeded.clone();
        seen.extend(report.failed.iter().map(|f| f.id));
        seen.sort_unstable();
        assert_eq!(seen, ids);
        assert_eq!(report.total(), ids.len());
        assert_eq!(report.failed.len(), 4); // 3, 6, 9, 12
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_siblings() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ids = [1, 2, 3, 4, 5];
        let report = run_batched(&ids, 5, |id| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if id == 1 { Err("first fails") } else { Ok(()) }
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(report.succeeded, vec![2, 3, 4, 5]);
        assert_eq!(report.failed.first().unwrap().id, 1);
    }

    #[tokio::test]
    async fn batches_run_sequentially() {
        // Track the highest number of operations in flight at once; with
        // batch size 2 it must never exceed 2.
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let ids: Vec<i32> = (0..10).collect();

        let report = run_batched(&ids, 2, |_| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<(), String>(())
            }
        })
        .await;

        assert_eq!(report.succeeded.len(), 10);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn empty_input_yields_empty_report() {
        let report = run_batched::<i32, _, _, String>(&[], 5, |_| async { Ok(()) }).await;
        assert!(report.succeeded.is_empty());
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn retries_stop_after_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let result = with_retries(3, Duration::from_millis(1), || {
            let calls = Arc::clone(&calls);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 1 {
                    Err("transient")
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retries_give_up_after_ceiling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let result: Result<(), &str> = with_retries(3, Duration::from_millis(1), || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("persistent")
            }
        })
        .await;

        assert_eq!(result, Err("persistent"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
