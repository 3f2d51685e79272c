//! Bulk mutation over predicate-selected candidates.
//!
//! Every bulk writer operation runs through [`run`]: a single dispatcher
//! pulls candidates from a [`DocumentStream`] and hands each one to its own
//! task. At most `bulk_concurrency` tasks are in flight; while every permit
//! is taken the dispatcher stops pulling candidates. Per-item outcomes are
//! folded into a [`BulkOutcome`] as tasks finish.
//!
//! ## Stopping a pass
//!
//! No new candidate is dispatched once either
//! - the writer's [`CancelToken`] is cancelled, or
//! - an item task reports [`ScanControl::Stop`].
//!
//! Items already dispatched run to completion and are counted.

use crate::cancel::CancelToken;
use crate::config::RepositoryConfig;
use crate::error::{RepoError, RepoResult};
use crate::stream::DocumentStream;
use futures_util::{FutureExt, StreamExt};
use partidb_store::{ItemKey, StoredDocument};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// One item a bulk pass could not apply.
#[derive(Debug)]
pub struct ItemFailure {
    /// The item's key.
    pub key: ItemKey,
    /// Why it failed.
    pub error: RepoError,
}

/// Result of a bulk pass.
///
/// `succeeded` counts items whose mutation was confirmed by the store.
/// Items a transform declined to persist are `skipped`. Neither failed
/// items nor skipped ones are part of [`BulkOutcome::count`].
#[derive(Debug, Default)]
pub struct BulkOutcome {
    /// Items mutated.
    pub succeeded: u64,
    /// Items visited but left unchanged on request.
    pub skipped: u64,
    /// Items whose mutation failed.
    pub failures: Vec<ItemFailure>,
    /// Error that cut the candidate scan short, if any.
    pub scan_error: Option<RepoError>,
    /// True if cancellation or a stop request ended dispatch early.
    pub stopped_early: bool,
}

impl BulkOutcome {
    /// The affected-item count.
    pub fn count(&self) -> u64 {
        self.succeeded
    }

    /// Number of failed items.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// True if every candidate was visited and none failed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.scan_error.is_none() && !self.stopped_early
    }

    fn record(&mut self, operation: &'static str, key: ItemKey, result: RepoResult<ItemReport>) {
        match result {
            Ok(report) if report.written => self.succeeded += 1,
            Ok(_) => self.skipped += 1,
            Err(error) => {
                warn!(
                    operation,
                    id = %key.id,
                    partition = %key.partition_key,
                    error = %error,
                    "bulk item failed"
                );
                self.failures.push(ItemFailure { key, error });
            }
        }
    }
}

/// Whether a bulk pass keeps scanning after an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanControl {
    /// Keep dispatching candidates.
    #[default]
    Continue,
    /// Dispatch nothing further.
    Stop,
}

/// A transform's decision for one item.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict<T> {
    /// The (possibly modified) item.
    pub item: T,
    /// Write `item` back to the store.
    pub persist: bool,
    /// Whether the pass continues.
    pub scan: ScanControl,
}

impl<T> Verdict<T> {
    /// Writes `item` back and continues.
    pub fn persist(item: T) -> Self {
        Self {
            item,
            persist: true,
            scan: ScanControl::Continue,
        }
    }

    /// Leaves the stored item unchanged and continues.
    pub fn skip(item: T) -> Self {
        Self {
            item,
            persist: false,
            scan: ScanControl::Continue,
        }
    }

    /// Ends the pass after this item.
    #[must_use]
    pub fn then_stop(mut self) -> Self {
        self.scan = ScanControl::Stop;
        self
    }
}

/// What an item task did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ItemReport {
    written: bool,
    stop: bool,
}

impl ItemReport {
    pub(crate) fn written() -> Self {
        Self {
            written: true,
            stop: false,
        }
    }

    pub(crate) fn skipped() -> Self {
        Self {
            written: false,
            stop: false,
        }
    }

    pub(crate) fn stop_if(mut self, scan: ScanControl) -> Self {
        self.stop = scan == ScanControl::Stop;
        self
    }
}

/// Runs `work` for every candidate in `candidates`.
///
/// # Errors
///
/// Returns the scan error if the candidate stream fails before any item was
/// dispatched. Later scan errors are reported in [`BulkOutcome::scan_error`].
pub(crate) async fn run<F, Fut>(
    operation: &'static str,
    mut candidates: DocumentStream,
    config: &RepositoryConfig,
    cancel: Option<&CancelToken>,
    work: F,
) -> RepoResult<BulkOutcome>
where
    F: Fn(StoredDocument) -> Fut,
    Fut: Future<Output = RepoResult<ItemReport>> + Send + 'static,
{
    let permits = Arc::new(Semaphore::new(config.bulk_concurrency.max(1)));
    let stop = CancelToken::new();
    let mut tasks: JoinSet<(ItemKey, RepoResult<ItemReport>)> = JoinSet::new();
    let mut outcome = BulkOutcome::default();
    let mut dispatched = 0u64;

    let halted =
        |stop: &CancelToken| stop.is_cancelled() || cancel.is_some_and(CancelToken::is_cancelled);

    loop {
        if halted(&stop) {
            outcome.stopped_early = true;
            break;
        }

        let permit = Arc::clone(&permits)
            .acquire_owned()
            .await
            .map_err(|_| RepoError::task_failed("bulk permits closed"))?;

        while let Some(Some(joined)) = tasks.join_next().now_or_never() {
            let (key, result) = joined.map_err(|e| RepoError::task_failed(e.to_string()))?;
            outcome.record(operation, key, result);
        }

        if halted(&stop) {
            outcome.stopped_early = true;
            break;
        }

        let document = match candidates.next().await {
            None => break,
            Some(Ok(document)) => document,
            Some(Err(err)) if dispatched == 0 => return Err(err.into()),
            Some(Err(err)) => {
                warn!(operation, error = %err, "candidate scan failed");
                outcome.scan_error = Some(err.into());
                break;
            }
        };

        let key = document.key.clone();
        let item = work(document);
        let stop = stop.clone();
        tasks.spawn(async move {
            let _permit = permit;
            let result = match AssertUnwindSafe(item).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(RepoError::task_failed("item task panicked")),
            };
            if matches!(&result, Ok(report) if report.stop) {
                stop.cancel();
            }
            (key, result)
        });
        dispatched += 1;
    }

    drop(candidates);

    while let Some(joined) = tasks.join_next().await {
        let (key, result) = joined.map_err(|e| RepoError::task_failed(e.to_string()))?;
        outcome.record(operation, key, result);
    }

    info!(
        operation,
        dispatched,
        succeeded = outcome.succeeded,
        skipped = outcome.skipped,
        failed = outcome.failed(),
        stopped_early = outcome.stopped_early,
        "bulk pass finished"
    );

    Ok(outcome)
}
