//! Error types for repository operations.

use partidb_store::{ItemKey, StoreError};
use thiserror::Error;

/// Result type for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Errors surfaced by readers and writers.
///
/// `NotFound` and `Conflict` are kept apart from generic store failures so
/// callers can match on them. A failed guard is not an error; guarded
/// updates report it as `Ok(false)`.
#[derive(Debug, Error)]
pub enum RepoError {
    /// The resolved item does not exist.
    #[error("not found: {key}")]
    NotFound {
        /// The resolved key.
        key: ItemKey,
    },

    /// An insert targeted a key that already exists.
    #[error("conflict: {key} already exists")]
    Conflict {
        /// The resolved key.
        key: ItemKey,
    },

    /// The item kept changing between guard evaluation and the write.
    #[error("concurrent modification of {key} after {attempts} attempts")]
    ConcurrentModification {
        /// The resolved key.
        key: ItemKey,
        /// Number of read-evaluate-write attempts made.
        attempts: u32,
    },

    /// A bulk write produced an entity that resolves to a different key
    /// than the one it was read from.
    #[error("item at {found} now resolves to {resolved}")]
    KeyChanged {
        /// The key the item was read from.
        found: ItemKey,
        /// The key the written entity resolves to.
        resolved: ItemKey,
    },

    /// A patch named a field the entity type does not declare.
    #[error("unknown field '{field}' for entity type {entity}")]
    UnknownField {
        /// The offending field name.
        field: String,
        /// The entity type name.
        entity: &'static str,
    },

    /// A document did not have the shape the repository expects.
    #[error("invalid document: {message}")]
    InvalidDocument {
        /// Description of the problem.
        message: String,
    },

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other store failure.
    #[error("store error: {0}")]
    Store(StoreError),

    /// A per-item task ended without producing a result.
    #[error("task failed: {message}")]
    TaskFailed {
        /// Description of the failure.
        message: String,
    },
}

impl RepoError {
    /// Creates an invalid document error.
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Creates a task failure error.
    pub fn task_failed(message: impl Into<String>) -> Self {
        Self::TaskFailed {
            message: message.into(),
        }
    }

    /// Returns true for [`RepoError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true for [`RepoError::Conflict`].
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<StoreError> for RepoError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { key } => Self::NotFound { key },
            StoreError::Conflict { key } => Self::Conflict { key },
            other => Self::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partidb_store::PartitionKey;

    fn key() -> ItemKey {
        ItemKey::new("car-1", PartitionKey::from("Chevy"))
    }

    #[test]
    fn store_not_found_maps_to_not_found() {
        let err: RepoError = StoreError::not_found(key()).into();
        assert!(err.is_not_found());
    }

    #[test]
    fn store_conflict_maps_to_conflict() {
        let err: RepoError = StoreError::conflict(key()).into();
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
    }

    #[test]
    fn other_store_errors_stay_generic() {
        let err: RepoError = StoreError::unavailable("connection reset").into();
        assert!(matches!(err, RepoError::Store(StoreError::Unavailable { .. })));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn key_changed_display_names_both_keys() {
        let err = RepoError::KeyChanged {
            found: key(),
            resolved: ItemKey::new("car-1", PartitionKey::from("Ford")),
        };
        assert_eq!(
            err.to_string(),
            "item at car-1@Chevy now resolves to car-1@Ford"
        );
    }

    #[test]
    fn unknown_field_display() {
        let err = RepoError::UnknownField {
            field: "colour".into(),
            entity: "Automobile",
        };
        assert_eq!(
            err.to_string(),
            "unknown field 'colour' for entity type Automobile"
        );
    }
}
