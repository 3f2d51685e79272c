//! Repository handles and the read/write contracts.

use crate::bulk::{BulkOutcome, Verdict};
use crate::config::RepositoryConfig;
use crate::entity::Entity;
use crate::error::RepoResult;
use crate::patch::Patch;
use crate::reader::Reader;
use crate::resolver::PartitionResolver;
use crate::strategy::IdentifierStrategy;
use crate::stream::{DocumentStream, EntityStream};
use crate::writer::Writer;
use async_trait::async_trait;
use partidb_store::{DocumentStore, Filter, QueryOptions};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Read operations on a repository of `T`.
#[async_trait]
pub trait ReadRepository<T: Entity>: Send + Sync {
    /// Reads one item by identifier.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::NotFound` if no item exists under the resolved key.
    async fn get(&self, id: &T::Id) -> RepoResult<T>;

    /// Streams every item matching `filter`, across partitions.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the query.
    async fn query(&self, filter: &Filter) -> RepoResult<EntityStream<T>>;

    /// Streams the items stored under the keys `ids` resolve to. Missing
    /// ids are omitted. An id that resolves without a partition key matches
    /// its storage id in every partition.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the query.
    async fn get_many(&self, ids: &[T::Id]) -> RepoResult<EntityStream<T>>;

    /// Collects every item matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns the first query, fetch or decode error.
    async fn find(&self, filter: &Filter) -> RepoResult<Vec<T>>;

    /// Counts the items matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns the first query or fetch error.
    async fn count(&self, filter: &Filter) -> RepoResult<u64>;
}

/// Write operations on a repository of `T`.
#[async_trait]
pub trait WriteRepository<T: Entity>: Send + Sync {
    /// Creates an item and returns the stored representation.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::Conflict` if the key is taken.
    async fn insert(&self, item: &T) -> RepoResult<T>;

    /// Inserts items one after another. Not atomic: the first failure
    /// stops the run and earlier inserts stay.
    ///
    /// # Errors
    ///
    /// Returns the first insert error.
    async fn insert_many(&self, items: &[T]) -> RepoResult<()>;

    /// Deletes an item. Deleting an absent item succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error for store failures other than "not found".
    async fn delete(&self, id: &T::Id) -> RepoResult<bool>;

    /// Creates or replaces an item.
    ///
    /// Returns true if an existing item was replaced, false if the item was
    /// created.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn update(&self, item: &T) -> RepoResult<bool>;

    /// Replaces an item only if `guard` accepts the stored version.
    ///
    /// Returns false without writing when the guard rejects.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::NotFound` if the item is absent, and
    /// `RepoError::ConcurrentModification` if it kept changing between the
    /// guard check and the write.
    async fn update_if<G>(&self, item: &T, guard: G) -> RepoResult<bool>
    where
        G: Fn(&T) -> bool + Send + Sync;

    /// Deletes every item matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the candidate query cannot be started.
    async fn delete_where(&self, filter: &Filter) -> RepoResult<BulkOutcome>;

    /// Merges `patch` into every item matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::UnknownField` before touching any item if the
    /// patch names an undeclared field, or an error if the candidate query
    /// cannot be started.
    async fn patch_where(&self, patch: &Patch, filter: &Filter) -> RepoResult<BulkOutcome>;

    /// Runs `transform` on every item matching `filter` and writes back the
    /// items it asks to persist.
    ///
    /// # Errors
    ///
    /// Returns an error only if the candidate query cannot be started.
    async fn update_with<F, Fut>(&self, transform: F, filter: &Filter) -> RepoResult<BulkOutcome>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Verdict<T>> + Send + 'static;
}

/// State shared by the readers and writers of one repository.
pub(crate) struct Context<T: Entity> {
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) resolver: PartitionResolver<T::Id>,
    pub(crate) config: RepositoryConfig,
}

impl<T: Entity> Context<T> {
    /// Opens a candidate stream for `filter`.
    pub(crate) async fn open(&self, filter: &Filter) -> RepoResult<DocumentStream> {
        let options = QueryOptions::default().max_item_count(self.config.page_size);
        let cursor = self.store.query(filter, options).await?;
        Ok(DocumentStream::new(cursor))
    }
}

/// A typed repository over a document store.
///
/// The repository owns no data. It binds a store handle, an optional
/// identifier strategy, and configuration, and hands out [`Reader`] and
/// [`Writer`] views that share them.
///
/// # Example
///
/// ```rust,no_run
/// use partidb_core::{Entity, FixedPartition, ReadRepository, Repository};
/// use partidb_store::InMemoryStore;
/// use serde::{Deserialize, Serialize};
/// use std::sync::Arc;
///
/// #[derive(Serialize, Deserialize)]
/// struct Automobile {
///     id: String,
///     make: String,
/// }
///
/// impl Entity for Automobile {
///     type Id = String;
///     const FIELDS: &'static [&'static str] = &["id", "make"];
///
///     fn id(&self) -> &String {
///         &self.id
///     }
///
///     fn partition_key(&self) -> Option<String> {
///         Some(self.make.clone())
///     }
/// }
///
/// # async fn run() -> partidb_core::RepoResult<()> {
/// let repo = Repository::<Automobile>::new(Arc::new(InMemoryStore::new()))
///     .with_strategy(FixedPartition::new("Chevy"));
/// let car = repo.reader().get(&"car-1".to_string()).await?;
/// # Ok(())
/// # }
/// ```
pub struct Repository<T: Entity> {
    store: Arc<dyn DocumentStore>,
    resolver: PartitionResolver<T::Id>,
    config: RepositoryConfig,
}

impl<T: Entity> Repository<T> {
    /// Creates a repository with default configuration and no strategy.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            resolver: PartitionResolver::new(),
            config: RepositoryConfig::default(),
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: RepositoryConfig) -> Self {
        self.config = config;
        self
    }

    /// Installs an identifier strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: impl IdentifierStrategy<T::Id> + 'static) -> Self {
        self.resolver = PartitionResolver::with_strategy(Arc::new(strategy));
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Returns the partition resolver.
    pub fn resolver(&self) -> &PartitionResolver<T::Id> {
        &self.resolver
    }

    /// Creates a reader.
    pub fn reader(&self) -> Reader<T> {
        Reader::new(self.context())
    }

    /// Creates a writer.
    pub fn writer(&self) -> Writer<T> {
        Writer::new(self.context())
    }

    fn context(&self) -> Arc<Context<T>> {
        Arc::new(Context {
            store: Arc::clone(&self.store),
            resolver: self.resolver.clone(),
            config: self.config.clone(),
        })
    }
}

impl<T: Entity> fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &std::any::type_name::<T>())
            .field("resolver", &self.resolver)
            .field("config", &self.config)
            .finish()
    }
}
