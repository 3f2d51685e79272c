//! Partition resolution.
//!
//! Turns identifiers and entities into the [`ItemKey`] every store call is
//! addressed by.
//!
//! ## Identifier precedence
//!
//! First match wins:
//! 1. The identifier carries a non-blank partition key of its own
//!    ([`DocumentId::partitioned`]): use the embedded pair as is.
//! 2. A strategy is configured: it fills in whatever step 1 left open.
//!    An embedded id from a partitioned identifier with a blank partition
//!    key is kept.
//! 3. No strategy: the embedded id (or the `Display` form) with no
//!    partition key.
//!
//! ## Entities
//!
//! Write paths resolve from the entity itself: the id from
//! [`Entity::id`] and the partition key from [`Entity::partition_key`],
//! which defaults to the partition a [`PartitionedId`](crate::PartitionedId)
//! carries.

use crate::entity::{storage_id, DocumentId, Entity};
use crate::strategy::IdentifierStrategy;
use partidb_store::{ItemKey, PartitionKey};
use std::fmt;
use std::sync::Arc;

/// Resolves identifiers and entities to item keys.
pub struct PartitionResolver<I> {
    strategy: Option<Arc<dyn IdentifierStrategy<I>>>,
}

impl<I: DocumentId> PartitionResolver<I> {
    /// Creates a resolver without a strategy.
    #[must_use]
    pub fn new() -> Self {
        Self { strategy: None }
    }

    /// Creates a resolver that consults `strategy`.
    pub fn with_strategy(strategy: Arc<dyn IdentifierStrategy<I>>) -> Self {
        Self {
            strategy: Some(strategy),
        }
    }

    /// Returns true if a strategy is configured.
    #[must_use]
    pub fn has_strategy(&self) -> bool {
        self.strategy.is_some()
    }

    /// Resolves an identifier.
    pub fn resolve_id(&self, id: &I) -> ItemKey {
        let mut embedded_id = None;

        if let Some((embedded, partition_key)) = id.partitioned() {
            if !partition_key.trim().is_empty() {
                return ItemKey::new(embedded, PartitionKey::new(partition_key));
            }
            if !embedded.trim().is_empty() {
                embedded_id = Some(embedded.to_string());
            }
        }

        if let Some(strategy) = &self.strategy {
            let resolved = strategy.resolve(id);
            let storage_id = embedded_id.unwrap_or(resolved.id);
            return ItemKey::new(storage_id, PartitionKey::new(resolved.partition_key));
        }

        ItemKey::new(
            embedded_id.unwrap_or_else(|| id.to_string()),
            PartitionKey::None,
        )
    }

    /// Resolves an entity for a write.
    pub fn resolve_entity<T>(&self, item: &T) -> ItemKey
    where
        T: Entity<Id = I>,
    {
        ItemKey::new(
            storage_id(item.id()),
            PartitionKey::from(item.partition_key()),
        )
    }
}

impl<I: DocumentId> Default for PartitionResolver<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> Clone for PartitionResolver<I> {
    fn clone(&self) -> Self {
        Self {
            strategy: self.strategy.clone(),
        }
    }
}

impl<I> fmt::Debug for PartitionResolver<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionResolver")
            .field("strategy", &self.strategy.is_some())
            .finish()
    }
}
