//! Error types for store operations.

use crate::key::ItemKey;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors a document store reports back to the repository layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No item exists under the key.
    #[error("item not found: {key}")]
    NotFound {
        /// The key that was looked up.
        key: ItemKey,
    },

    /// An item already exists under the key.
    #[error("item already exists: {key}")]
    Conflict {
        /// The key that collided.
        key: ItemKey,
    },

    /// A conditional write found a different version than expected.
    #[error("precondition failed for {key}: item was modified concurrently")]
    PreconditionFailed {
        /// The key whose version did not match.
        key: ItemKey,
    },

    /// The store cannot translate the filter into a query.
    #[error("invalid query: {message}")]
    InvalidQuery {
        /// Why the filter was rejected.
        message: String,
    },

    /// The store could not be reached or failed internally.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Creates a not-found error.
    pub fn not_found(key: ItemKey) -> Self {
        Self::NotFound { key }
    }

    /// Creates a conflict error.
    pub fn conflict(key: ItemKey) -> Self {
        Self::Conflict { key }
    }

    /// Creates a precondition-failed error.
    pub fn precondition_failed(key: ItemKey) -> Self {
        Self::PreconditionFailed { key }
    }

    /// Creates an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Returns true if the store reported the item as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::PartitionKey;

    #[test]
    fn not_found_display_includes_key() {
        let err = StoreError::not_found(ItemKey::new("car-1", PartitionKey::from("Chevy")));
        let text = err.to_string();
        assert!(text.contains("car-1"));
        assert!(text.contains("Chevy"));
        assert!(err.is_not_found());
    }

    #[test]
    fn invalid_query_is_not_not_found() {
        let err = StoreError::invalid_query("empty field path");
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "invalid query: empty field path");
    }
}
