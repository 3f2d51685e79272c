//! Entity and identifier capabilities.
//!
//! Every type stored through a repository implements [`Entity`]. The trait
//! is the whole capability surface the engine relies on: an identifier
//! accessor, the declared field set, and an optional partition key. There is
//! no reflective fallback; a type that does not say how it is partitioned is
//! stored without a partition key.

use crate::error::{RepoError, RepoResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// An identifier type a repository can be keyed by.
///
/// The `Display` form is the fallback storage id. Identifiers that carry
/// their own partition key override [`DocumentId::partitioned`].
pub trait DocumentId: fmt::Display + Send + Sync + 'static {
    /// Returns the embedded `(storage id, partition key)` pair, if this
    /// identifier carries one.
    fn partitioned(&self) -> Option<(&str, &str)> {
        None
    }
}

impl DocumentId for String {}
impl DocumentId for Uuid {}
impl DocumentId for u64 {}
impl DocumentId for i64 {}
impl DocumentId for u32 {}
impl DocumentId for i32 {}

/// An identifier that names its partition explicitly.
///
/// Passing a `PartitionedId` bypasses any configured identifier strategy,
/// which lets a caller override automatic partition derivation per call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionedId {
    /// Storage id.
    pub id: String,
    /// Partition key.
    pub partition_key: String,
}

impl PartitionedId {
    /// Creates a partitioned identifier.
    pub fn new(id: impl Into<String>, partition_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            partition_key: partition_key.into(),
        }
    }
}

impl fmt::Display for PartitionedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl DocumentId for PartitionedId {
    fn partitioned(&self) -> Option<(&str, &str)> {
        Some((&self.id, &self.partition_key))
    }
}

/// A type that can be stored in a partitioned document store.
///
/// # Example
///
/// ```rust
/// use partidb_core::Entity;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Automobile {
///     id: String,
///     make: String,
///     year: i32,
/// }
///
/// impl Entity for Automobile {
///     type Id = String;
///     const FIELDS: &'static [&'static str] = &["id", "make", "year"];
///
///     fn id(&self) -> &String {
///         &self.id
///     }
///
///     fn partition_key(&self) -> Option<String> {
///         Some(self.make.clone())
///     }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The identifier type.
    type Id: DocumentId;

    /// Serialized names of every field a partial update may touch.
    const FIELDS: &'static [&'static str];

    /// Returns the entity's identifier.
    fn id(&self) -> &Self::Id;

    /// Returns the partition key this entity is stored under.
    ///
    /// The default is the partition embedded in the identifier, if it
    /// carries one, so an entity keyed by a [`PartitionedId`] is read back
    /// by that same id. Otherwise the entity goes to the "no partition key"
    /// partition.
    fn partition_key(&self) -> Option<String> {
        self.id()
            .partitioned()
            .map(|(_, partition_key)| partition_key.to_string())
    }
}

/// Returns the storage id for an identifier: the embedded id of a
/// partitioned identifier, else its `Display` form.
pub(crate) fn storage_id<I: DocumentId>(id: &I) -> String {
    match id.partitioned() {
        Some((embedded, _)) if !embedded.trim().is_empty() => embedded.to_string(),
        _ => id.to_string(),
    }
}

/// Serializes an entity into a document body.
pub(crate) fn encode<T: Entity>(item: &T) -> RepoResult<Value> {
    let body = serde_json::to_value(item)?;
    if !body.is_object() {
        return Err(RepoError::invalid_document(format!(
            "{} does not serialize to a JSON object",
            std::any::type_name::<T>()
        )));
    }
    Ok(body)
}

/// Deserializes a document body into an entity.
pub(crate) fn decode<T: Entity>(body: Value) -> RepoResult<T> {
    Ok(serde_json::from_value(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: u64,
        text: String,
    }

    impl Entity for Note {
        type Id = u64;
        const FIELDS: &'static [&'static str] = &["id", "text"];

        fn id(&self) -> &u64 {
            &self.id
        }
    }

    #[derive(Serialize, Deserialize)]
    struct Scalar(i32);

    impl Entity for Scalar {
        type Id = i32;
        const FIELDS: &'static [&'static str] = &[];

        fn id(&self) -> &i32 {
            &self.0
        }
    }

    #[test]
    fn plain_ids_are_not_partitioned() {
        assert!("abc".to_string().partitioned().is_none());
        assert!(7u64.partitioned().is_none());
        assert!(Uuid::new_v4().partitioned().is_none());
    }

    #[test]
    fn partitioned_id_exposes_pair() {
        let id = PartitionedId::new("car-1", "Chevy");
        assert_eq!(id.partitioned(), Some(("car-1", "Chevy")));
        assert_eq!(id.to_string(), "car-1");
    }

    #[test]
    fn storage_id_prefers_embedded_id() {
        assert_eq!(storage_id(&PartitionedId::new("car-1", "Chevy")), "car-1");
        assert_eq!(storage_id(&42u64), "42");
        assert_eq!(storage_id(&"plain".to_string()), "plain");
    }

    #[test]
    fn default_partition_key_is_none() {
        let note = Note {
            id: 1,
            text: "hi".into(),
        };
        assert!(note.partition_key().is_none());
    }

    #[derive(Serialize, Deserialize)]
    struct Pinned {
        id: PartitionedId,
    }

    impl Entity for Pinned {
        type Id = PartitionedId;
        const FIELDS: &'static [&'static str] = &["id"];

        fn id(&self) -> &PartitionedId {
            &self.id
        }
    }

    #[test]
    fn default_partition_key_follows_partitioned_id() {
        let pinned = Pinned {
            id: PartitionedId::new("p-1", "Audi"),
        };
        assert_eq!(pinned.partition_key().as_deref(), Some("Audi"));
    }

    #[test]
    fn encode_decode_roundtrip() {
        let note = Note {
            id: 3,
            text: "hello".into(),
        };
        let body = encode(&note).unwrap();
        assert_eq!(body, json!({ "id": 3, "text": "hello" }));
        let back: Note = decode(body).unwrap();
        assert_eq!(back, note);
    }

    #[test]
    fn encode_rejects_non_objects() {
        let result = encode(&Scalar(5));
        assert!(matches!(result, Err(RepoError::InvalidDocument { .. })));
    }

    #[test]
    fn decode_reports_shape_errors() {
        let result: RepoResult<Note> = decode(json!({ "id": "not-a-number" }));
        assert!(matches!(result, Err(RepoError::Serialization(_))));
    }
}
