//! Item addressing: partition keys, item keys and version tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The partition an item is routed to.
///
/// `None` is the "no partition key" sentinel. Items written without a
/// partition key live in their own partition and are addressed with `None`
/// on every subsequent operation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum PartitionKey {
    /// No partition key.
    #[default]
    None,
    /// An explicit partition key value.
    Value(String),
}

impl PartitionKey {
    /// Creates a partition key, mapping blank strings to [`PartitionKey::None`].
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Self::None
        } else {
            Self::Value(value)
        }
    }

    /// Returns the key value, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Value(v) => Some(v),
        }
    }

    /// Returns true for the "no partition key" sentinel.
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl From<&str> for PartitionKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PartitionKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<Option<String>> for PartitionKey {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::None, Self::new)
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "<none>"),
            Self::Value(v) => write!(f, "{v}"),
        }
    }
}

/// The canonical address of one stored item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    /// Storage identifier, unique within a partition.
    pub id: String,
    /// Partition the item lives in.
    pub partition_key: PartitionKey,
}

impl ItemKey {
    /// Creates an item key.
    pub fn new(id: impl Into<String>, partition_key: impl Into<PartitionKey>) -> Self {
        Self {
            id: id.into(),
            partition_key: partition_key.into(),
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.partition_key)
    }
}

/// Opaque version tag issued by the store on every successful write.
///
/// Conditional writes compare the tag the caller read against the tag the
/// store currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ETag(String);

impl ETag {
    /// Wraps a store-issued tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Generates a fresh random tag.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Returns the raw tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}
