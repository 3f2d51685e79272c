//! Reader implementation.

use crate::entity::{decode, Entity};
use crate::error::RepoResult;
use crate::repository::{Context, ReadRepository};
use crate::stream::EntityStream;
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use partidb_store::Filter;
use std::sync::Arc;
use tracing::debug;

/// Read side of a repository.
pub struct Reader<T: Entity> {
    context: Arc<Context<T>>,
}

impl<T: Entity> Reader<T> {
    pub(crate) fn new(context: Arc<Context<T>>) -> Self {
        Self { context }
    }
}

impl<T: Entity> Clone for Reader<T> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
        }
    }
}

impl<T: Entity> std::fmt::Debug for Reader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("entity", &std::any::type_name::<T>())
            .finish()
    }
}

#[async_trait]
impl<T: Entity> ReadRepository<T> for Reader<T> {
    async fn get(&self, id: &T::Id) -> RepoResult<T> {
        let key = self.context.resolver.resolve_id(id);
        debug!(id = %key.id, partition = %key.partition_key, "get");
        let document = self.context.store.read_item(&key).await?;
        decode(document.body)
    }

    async fn query(&self, filter: &Filter) -> RepoResult<EntityStream<T>> {
        debug!(?filter, "query");
        let documents = self.context.open(filter).await?;
        Ok(EntityStream::new(documents))
    }

    async fn get_many(&self, ids: &[T::Id]) -> RepoResult<EntityStream<T>> {
        let keys: Vec<_> = ids
            .iter()
            .map(|id| self.context.resolver.resolve_id(id))
            .collect();
        debug!(ids = keys.len(), "get_many");
        let documents = self.context.open(&Filter::key_in(keys)).await?;
        Ok(EntityStream::new(documents))
    }

    async fn find(&self, filter: &Filter) -> RepoResult<Vec<T>> {
        self.query(filter).await?.try_collect().await
    }

    async fn count(&self, filter: &Filter) -> RepoResult<u64> {
        debug!(?filter, "count");
        let mut documents = self.context.open(filter).await?;
        let mut count = 0u64;
        while let Some(document) = documents.next().await {
            document?;
            count += 1;
        }
        Ok(count)
    }
}
