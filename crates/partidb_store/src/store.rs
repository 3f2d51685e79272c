//! Document store trait definition.

use crate::error::StoreResult;
use crate::filter::Filter;
use crate::key::{ETag, ItemKey};
use async_trait::async_trait;
use serde_json::Value;

/// A document as returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Where the document lives.
    pub key: ItemKey,
    /// Version tag of this revision.
    pub etag: ETag,
    /// The document body, always a JSON object.
    pub body: Value,
}

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// An existing item was replaced in place.
    Replaced,
    /// No item existed; a new one was created.
    Created,
}

/// Precondition attached to a write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WriteCondition {
    /// Write unconditionally (create or replace).
    #[default]
    Always,
    /// Replace only if the stored item still carries this tag.
    ///
    /// Fails with `NotFound` if the item is gone and with
    /// `PreconditionFailed` if it was modified.
    IfMatch(ETag),
}

/// Options for a predicate query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Maximum number of items per page.
    pub max_item_count: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            max_item_count: 100,
        }
    }
}

impl QueryOptions {
    /// Sets the page size.
    #[must_use]
    pub const fn max_item_count(mut self, count: usize) -> Self {
        self.max_item_count = count;
        self
    }
}

/// A paged result cursor.
///
/// Cursors are forward-only and not restartable. Implementations release
/// any server-side or client-side resources in `Drop`, so a cursor that is
/// dropped before exhaustion does not leak.
#[async_trait]
pub trait PageCursor: Send {
    /// Returns true while another page may be fetched.
    fn has_more_results(&self) -> bool;

    /// Fetches the next page.
    ///
    /// A page may be empty even when more pages follow.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be fetched.
    async fn next_page(&mut self) -> StoreResult<Vec<StoredDocument>>;
}

/// The document store a repository talks to.
///
/// Stores are **external collaborators**: this crate only fixes the
/// contract. Each call is one round trip; nothing here is transactional
/// across calls.
///
/// # Invariants
///
/// - Every successful write issues a new [`ETag`]
/// - `read_item` returns the revision most recently written under the key
/// - `query` honours [`Filter::matches`] semantics
/// - Implementations must be `Send + Sync`; one handle is shared by all
///   concurrent repository tasks
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads one item.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no item exists under `key`.
    async fn read_item(&self, key: &ItemKey) -> StoreResult<StoredDocument>;

    /// Creates a new item.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if an item already exists under `key`.
    async fn create_item(&self, key: &ItemKey, body: Value) -> StoreResult<StoredDocument>;

    /// Creates or replaces an item.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` or `StoreError::PreconditionFailed`
    /// when a [`WriteCondition::IfMatch`] cannot be satisfied.
    async fn upsert_item(
        &self,
        key: &ItemKey,
        body: Value,
        condition: WriteCondition,
    ) -> StoreResult<UpsertOutcome>;

    /// Deletes an item.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no item exists under `key`.
    async fn delete_item(&self, key: &ItemKey) -> StoreResult<()>;

    /// Opens a cursor over every item matching `filter`, across partitions.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidQuery` if the filter cannot be translated.
    async fn query(&self, filter: &Filter, options: QueryOptions)
        -> StoreResult<Box<dyn PageCursor>>;
}
