//! Writer implementation.
//!
//! Single-item writes resolve the entity's key and make one store call,
//! except guarded updates, which read, evaluate and then write
//! conditionally on the etag they read.
//!
//! Bulk writes select candidates with a predicate query and hand them to
//! the bulk engine. Each candidate is written back under the key it was
//! found at, conditionally on the etag it was read with, so a concurrent
//! writer makes the item fail instead of being overwritten. A patch or
//! transform that changes the entity's id or partition key fails the item
//! with [`RepoError::KeyChanged`]; bulk writes never move items.

use crate::bulk::{self, BulkOutcome, ItemReport, Verdict};
use crate::cancel::CancelToken;
use crate::entity::{decode, encode, Entity};
use crate::error::{RepoError, RepoResult};
use crate::patch::Patch;
use crate::repository::{Context, WriteRepository};
use async_trait::async_trait;
use partidb_store::{Filter, ItemKey, StoreError, UpsertOutcome, WriteCondition};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Write side of a repository.
pub struct Writer<T: Entity> {
    context: Arc<Context<T>>,
    cancel: Option<CancelToken>,
}

impl<T: Entity> Writer<T> {
    pub(crate) fn new(context: Arc<Context<T>>) -> Self {
        Self {
            context,
            cancel: None,
        }
    }

    /// Makes bulk operations observe `token`.
    ///
    /// Once the token is cancelled no further candidates are dispatched and
    /// bulk calls return their partial outcome.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl<T: Entity> Clone for Writer<T> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            cancel: self.cancel.clone(),
        }
    }
}

impl<T: Entity> std::fmt::Debug for Writer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("entity", &std::any::type_name::<T>())
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

fn ensure_same_key<T: Entity>(context: &Context<T>, found: &ItemKey, item: &T) -> RepoResult<()> {
    let resolved = context.resolver.resolve_entity(item);
    if resolved == *found {
        return Ok(());
    }
    Err(RepoError::KeyChanged {
        found: found.clone(),
        resolved,
    })
}

#[async_trait]
impl<T: Entity> WriteRepository<T> for Writer<T> {
    async fn insert(&self, item: &T) -> RepoResult<T> {
        let key = self.context.resolver.resolve_entity(item);
        let body = encode(item)?;
        debug!(id = %key.id, partition = %key.partition_key, "insert");
        let document = self.context.store.create_item(&key, body).await?;
        decode(document.body)
    }

    async fn insert_many(&self, items: &[T]) -> RepoResult<()> {
        debug!(items = items.len(), "insert_many");
        for item in items {
            self.insert(item).await?;
        }
        Ok(())
    }

    async fn delete(&self, id: &T::Id) -> RepoResult<bool> {
        let key = self.context.resolver.resolve_id(id);
        debug!(id = %key.id, partition = %key.partition_key, "delete");
        match self.context.store.delete_item(&key).await {
            Ok(()) => Ok(true),
            Err(err) if err.is_not_found() => {
                debug!(id = %key.id, partition = %key.partition_key, "delete of absent item");
                Ok(true)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update(&self, item: &T) -> RepoResult<bool> {
        let key = self.context.resolver.resolve_entity(item);
        let body = encode(item)?;
        debug!(id = %key.id, partition = %key.partition_key, "update");
        let outcome = self
            .context
            .store
            .upsert_item(&key, body, WriteCondition::Always)
            .await?;
        Ok(outcome == UpsertOutcome::Replaced)
    }

    async fn update_if<G>(&self, item: &T, guard: G) -> RepoResult<bool>
    where
        G: Fn(&T) -> bool + Send + Sync,
    {
        let key = self.context.resolver.resolve_entity(item);
        let body = encode(item)?;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            debug!(id = %key.id, partition = %key.partition_key, attempt = attempts, "update_if");

            let current = self.context.store.read_item(&key).await?;
            let stored: T = decode(current.body)?;
            if !guard(&stored) {
                debug!(id = %key.id, partition = %key.partition_key, "guard rejected update");
                return Ok(false);
            }

            let condition = WriteCondition::IfMatch(current.etag);
            match self.context.store.upsert_item(&key, body.clone(), condition).await {
                Ok(_) => return Ok(true),
                Err(StoreError::PreconditionFailed { .. })
                    if attempts <= self.context.config.guard_retries =>
                {
                    warn!(
                        id = %key.id,
                        partition = %key.partition_key,
                        attempt = attempts,
                        "item changed during guarded update, retrying"
                    );
                }
                Err(StoreError::PreconditionFailed { key }) => {
                    return Err(RepoError::ConcurrentModification { key, attempts });
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn delete_where(&self, filter: &Filter) -> RepoResult<BulkOutcome> {
        debug!(?filter, "delete_where");
        let candidates = self.context.open(filter).await?;
        let context = Arc::clone(&self.context);

        bulk::run(
            "delete_where",
            candidates,
            &self.context.config,
            self.cancel.as_ref(),
            move |document| {
                let context = Arc::clone(&context);
                async move {
                    context.store.delete_item(&document.key).await?;
                    Ok(ItemReport::written())
                }
            },
        )
        .await
    }

    async fn patch_where(&self, patch: &Patch, filter: &Filter) -> RepoResult<BulkOutcome> {
        patch.validate::<T>()?;
        debug!(?filter, fields = patch.len(), "patch_where");
        let candidates = self.context.open(filter).await?;
        let context = Arc::clone(&self.context);
        let patch = Arc::new(patch.clone());

        bulk::run(
            "patch_where",
            candidates,
            &self.context.config,
            self.cancel.as_ref(),
            move |document| {
                let context = Arc::clone(&context);
                let patch = Arc::clone(&patch);
                async move {
                    let mut body = document.body;
                    patch.apply(&mut body)?;
                    let patched: T = decode(body.clone())?;
                    ensure_same_key(&context, &document.key, &patched)?;
                    let condition = WriteCondition::IfMatch(document.etag);
                    context
                        .store
                        .upsert_item(&document.key, body, condition)
                        .await?;
                    Ok(ItemReport::written())
                }
            },
        )
        .await
    }

    async fn update_with<F, Fut>(&self, transform: F, filter: &Filter) -> RepoResult<BulkOutcome>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Verdict<T>> + Send + 'static,
    {
        debug!(?filter, "update_with");
        let candidates = self.context.open(filter).await?;
        let context = Arc::clone(&self.context);
        let transform = Arc::new(transform);

        bulk::run(
            "update_with",
            candidates,
            &self.context.config,
            self.cancel.as_ref(),
            move |document| {
                let context = Arc::clone(&context);
                let transform = Arc::clone(&transform);
                async move {
                    let item: T = decode(document.body)?;
                    let verdict = transform(item).await;
                    if !verdict.persist {
                        return Ok(ItemReport::skipped().stop_if(verdict.scan));
                    }
                    ensure_same_key(&context, &document.key, &verdict.item)?;
                    let body = encode(&verdict.item)?;
                    let condition = WriteCondition::IfMatch(document.etag);
                    context
                        .store
                        .upsert_item(&document.key, body, condition)
                        .await?;
                    Ok(ItemReport::written().stop_if(verdict.scan))
                }
            },
        )
        .await
    }
}
