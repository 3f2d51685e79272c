//! Fault injection and instrumentation for store-level tests.
//!
//! [`FaultyStore`] wraps an [`InMemoryStore`] and can:
//! - fail every write aimed at chosen ids
//! - fail a query cursor on a chosen page
//! - modify an item right after it is read, to force guard races
//! - slow writes down and record how many were in flight at once
//!
//! ## Usage
//!
//! ```rust,ignore
//! use partidb_testkit::faults::FaultyStore;
//!
//! let store = FaultyStore::new();
//! store.fail_writes_for("car-3");
//! store.fail_on_page(2);
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use partidb_store::{
    DocumentStore, Filter, InMemoryStore, ItemKey, PageCursor, QueryOptions, StoreError,
    StoreResult, StoredDocument, UpsertOutcome, WriteCondition,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A document store wrapper that injects failures and records concurrency.
#[derive(Debug, Default)]
pub struct FaultyStore {
    inner: InMemoryStore,
    failing_ids: Mutex<HashSet<String>>,
    races: Mutex<HashMap<String, u32>>,
    fail_page: AtomicUsize,
    write_delay_ms: AtomicU64,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: AtomicUsize,
    writes: AtomicUsize,
}

impl FaultyStore {
    /// Creates a store with no faults configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the wrapped in-memory store.
    pub fn memory(&self) -> &InMemoryStore {
        &self.inner
    }

    /// Makes every write to an item with storage id `id` fail.
    pub fn fail_writes_for(&self, id: impl Into<String>) {
        self.failing_ids.lock().insert(id.into());
    }

    /// Makes query cursors fail when fetching page `page` (1-based).
    pub fn fail_on_page(&self, page: usize) {
        self.fail_page.store(page, Ordering::SeqCst);
    }

    /// Rewrites the item with storage id `id` right after each of its next
    /// `times` reads, so the etag the reader saw is stale.
    pub fn race_reads_of(&self, id: impl Into<String>, times: u32) {
        self.races.lock().insert(id.into(), times);
    }

    /// Delays every write by `delay`.
    pub fn set_write_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.write_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Clears every configured fault and resets the counters.
    pub fn reset(&self) {
        self.failing_ids.lock().clear();
        self.races.lock().clear();
        self.fail_page.store(0, Ordering::SeqCst);
        self.write_delay_ms.store(0, Ordering::SeqCst);
        self.peak_in_flight.store(0, Ordering::SeqCst);
        self.writes.store(0, Ordering::SeqCst);
    }

    /// Highest number of writes observed in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Number of writes that reached the inner store.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of query cursors not yet released.
    pub fn open_cursors(&self) -> usize {
        self.inner.open_cursors()
    }

    async fn begin_write(&self, key: &ItemKey) -> StoreResult<InFlight> {
        let guard = InFlight::enter(Arc::clone(&self.in_flight));
        self.peak_in_flight.fetch_max(guard.level, Ordering::SeqCst);

        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.failing_ids.lock().contains(&key.id) {
            return Err(StoreError::unavailable(format!("injected failure for {key}")));
        }
        Ok(guard)
    }

    fn take_race(&self, key: &ItemKey) -> bool {
        let mut races = self.races.lock();
        match races.get_mut(&key.id) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

struct InFlight {
    counter: Arc<AtomicUsize>,
    level: usize,
}

impl InFlight {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        let level = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Self { counter, level }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for FaultyStore {
    async fn read_item(&self, key: &ItemKey) -> StoreResult<StoredDocument> {
        let document = self.inner.read_item(key).await?;
        if self.take_race(key) {
            self.inner
                .upsert_item(key, document.body.clone(), WriteCondition::Always)
                .await?;
        }
        Ok(document)
    }

    async fn create_item(&self, key: &ItemKey, body: Value) -> StoreResult<StoredDocument> {
        let _guard = self.begin_write(key).await?;
        let document = self.inner.create_item(key, body).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(document)
    }

    async fn upsert_item(
        &self,
        key: &ItemKey,
        body: Value,
        condition: WriteCondition,
    ) -> StoreResult<UpsertOutcome> {
        let _guard = self.begin_write(key).await?;
        let outcome = self.inner.upsert_item(key, body, condition).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(outcome)
    }

    async fn delete_item(&self, key: &ItemKey) -> StoreResult<()> {
        let _guard = self.begin_write(key).await?;
        self.inner.delete_item(key).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn query(
        &self,
        filter: &Filter,
        options: QueryOptions,
    ) -> StoreResult<Box<dyn PageCursor>> {
        let inner = self.inner.query(filter, options).await?;
        let fail_at = self.fail_page.load(Ordering::SeqCst);
        Ok(Box::new(FaultyCursor {
            inner,
            fetched: 0,
            fail_at,
        }))
    }
}

/// Wraps a cursor and fails one page fetch.
struct FaultyCursor {
    inner: Box<dyn PageCursor>,
    fetched: usize,
    fail_at: usize,
}

#[async_trait]
impl PageCursor for FaultyCursor {
    fn has_more_results(&self) -> bool {
        self.inner.has_more_results()
    }

    async fn next_page(&mut self) -> StoreResult<Vec<StoredDocument>> {
        self.fetched += 1;
        if self.fetched == self.fail_at {
            return Err(StoreError::unavailable(format!(
                "injected failure on page {}",
                self.fetched
            )));
        }
        self.inner.next_page().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(id: &str) -> ItemKey {
        ItemKey::new(id, "p")
    }

    #[tokio::test]
    async fn injected_write_failures_are_per_id() {
        let store = FaultyStore::new();
        store.fail_writes_for("bad");

        assert!(store.create_item(&key("good"), json!({})).await.is_ok());
        let err = store.create_item(&key("bad"), json!({})).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { .. }));
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn raced_read_returns_stale_etag() {
        let store = FaultyStore::new();
        store.create_item(&key("a"), json!({ "v": 1 })).await.unwrap();
        store.race_reads_of("a", 1);

        let stale = store.read_item(&key("a")).await.unwrap();
        let result = store
            .upsert_item(&key("a"), json!({ "v": 2 }), WriteCondition::IfMatch(stale.etag))
            .await;
        assert!(matches!(result, Err(StoreError::PreconditionFailed { .. })));

        let fresh = store.read_item(&key("a")).await.unwrap();
        let result = store
            .upsert_item(&key("a"), json!({ "v": 2 }), WriteCondition::IfMatch(fresh.etag))
            .await;
        assert_eq!(result.unwrap(), UpsertOutcome::Replaced);
    }

    #[tokio::test]
    async fn cursor_fails_on_configured_page() {
        let store = FaultyStore::new();
        for i in 0..4 {
            store.create_item(&key(&format!("i{i}")), json!({})).await.unwrap();
        }
        store.fail_on_page(2);

        let mut cursor = store
            .query(&Filter::all(), QueryOptions::default().max_item_count(2))
            .await
            .unwrap();
        assert_eq!(cursor.next_page().await.unwrap().len(), 2);
        assert!(cursor.next_page().await.is_err());
        drop(cursor);
        assert_eq!(store.open_cursors(), 0);
    }

    #[tokio::test]
    async fn reset_clears_faults() {
        let store = FaultyStore::new();
        store.fail_writes_for("x");
        store.reset();
        assert!(store.create_item(&key("x"), json!({})).await.is_ok());
    }
}
