//! In-memory document store for testing.

use crate::error::{StoreError, StoreResult};
use crate::filter::Filter;
use crate::key::{ETag, ItemKey};
use crate::store::{
    DocumentStore, PageCursor, QueryOptions, StoredDocument, UpsertOutcome, WriteCondition,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Revision {
    etag: ETag,
    body: Value,
}

/// An in-memory document store.
///
/// This store keeps every item in a map keyed by [`ItemKey`] and is
/// suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral repositories that don't need persistence
///
/// Every operation yields to the runtime once before touching the map, so
/// concurrent callers interleave the way they would against a remote store.
///
/// # Example
///
/// ```rust
/// use partidb_store::{DocumentStore, InMemoryStore, ItemKey};
/// use serde_json::json;
///
/// # async fn run() -> partidb_store::StoreResult<()> {
/// let store = InMemoryStore::new();
/// let key = ItemKey::new("car-1", "Chevy");
/// store.create_item(&key, json!({ "model": "Camaro" })).await?;
/// let doc = store.read_item(&key).await?;
/// assert_eq!(doc.body["model"], "Camaro");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    items: RwLock<BTreeMap<ItemKey, Revision>>,
    open_cursors: Arc<AtomicUsize>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns true if the store holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Returns the number of cursors that have been opened and not yet dropped.
    #[must_use]
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    /// Removes every item.
    pub fn clear(&self) {
        self.items.write().clear();
    }

    fn document(key: &ItemKey, revision: &Revision) -> StoredDocument {
        StoredDocument {
            key: key.clone(),
            etag: revision.etag.clone(),
            body: revision.body.clone(),
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn read_item(&self, key: &ItemKey) -> StoreResult<StoredDocument> {
        tokio::task::yield_now().await;
        self.items
            .read()
            .get(key)
            .map(|revision| Self::document(key, revision))
            .ok_or_else(|| StoreError::not_found(key.clone()))
    }

    async fn create_item(&self, key: &ItemKey, body: Value) -> StoreResult<StoredDocument> {
        tokio::task::yield_now().await;
        let mut items = self.items.write();
        if items.contains_key(key) {
            return Err(StoreError::conflict(key.clone()));
        }

        let revision = Revision {
            etag: ETag::generate(),
            body,
        };
        let doc = Self::document(key, &revision);
        items.insert(key.clone(), revision);
        Ok(doc)
    }

    async fn upsert_item(
        &self,
        key: &ItemKey,
        body: Value,
        condition: WriteCondition,
    ) -> StoreResult<UpsertOutcome> {
        tokio::task::yield_now().await;
        let mut items = self.items.write();

        let outcome = match (&condition, items.get(key)) {
            (WriteCondition::IfMatch(_), None) => return Err(StoreError::not_found(key.clone())),
            (WriteCondition::IfMatch(expected), Some(current)) if &current.etag != expected => {
                return Err(StoreError::precondition_failed(key.clone()));
            }
            (_, Some(_)) => UpsertOutcome::Replaced,
            (WriteCondition::Always, None) => UpsertOutcome::Created,
        };

        items.insert(
            key.clone(),
            Revision {
                etag: ETag::generate(),
                body,
            },
        );
        Ok(outcome)
    }

    async fn delete_item(&self, key: &ItemKey) -> StoreResult<()> {
        tokio::task::yield_now().await;
        self.items
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(key.clone()))
    }

    async fn query(
        &self,
        filter: &Filter,
        options: QueryOptions,
    ) -> StoreResult<Box<dyn PageCursor>> {
        filter.validate()?;
        tokio::task::yield_now().await;

        let matching: Vec<StoredDocument> = self
            .items
            .read()
            .iter()
            .filter(|(key, revision)| filter.matches(key, &revision.body))
            .map(|(key, revision)| Self::document(key, revision))
            .collect();

        let page_size = options.max_item_count.max(1);
        let pages: VecDeque<Vec<StoredDocument>> = matching
            .chunks(page_size)
            .map(<[StoredDocument]>::to_vec)
            .collect();

        Ok(Box::new(MemoryCursor::new(
            pages,
            Arc::clone(&self.open_cursors),
        )))
    }
}

/// Cursor over a snapshot taken when the query was opened.
struct MemoryCursor {
    pages: VecDeque<Vec<StoredDocument>>,
    open_cursors: Arc<AtomicUsize>,
}

impl MemoryCursor {
    fn new(pages: VecDeque<Vec<StoredDocument>>, open_cursors: Arc<AtomicUsize>) -> Self {
        open_cursors.fetch_add(1, Ordering::SeqCst);
        Self {
            pages,
            open_cursors,
        }
    }
}

#[async_trait]
impl PageCursor for MemoryCursor {
    fn has_more_results(&self) -> bool {
        !self.pages.is_empty()
    }

    async fn next_page(&mut self) -> StoreResult<Vec<StoredDocument>> {
        tokio::task::yield_now().await;
        Ok(self.pages.pop_front().unwrap_or_default())
    }
}

impl Drop for MemoryCursor {
    fn drop(&mut self) {
        self.open_cursors.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(remaining_pages = self.pages.len(), "memory cursor released");
    }
}
