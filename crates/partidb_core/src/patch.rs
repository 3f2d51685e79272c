//! Partial updates.

use crate::entity::Entity;
use crate::error::{RepoError, RepoResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A set of top-level field assignments.
///
/// Applying a patch touches only the named fields; every other field of the
/// stored document is left as it was. A field set to `None` is written as
/// `null`.
///
/// # Example
///
/// ```rust
/// use partidb_core::Patch;
///
/// let patch = Patch::new().set("year", 1970).clear("color");
/// assert_eq!(patch.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch {
    fields: BTreeMap<String, Option<Value>>,
}

impl Patch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a value to a field.
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), Some(value.into()));
        self
    }

    /// Assigns any serializable value to a field.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be serialized.
    pub fn try_set<V: Serialize>(
        mut self,
        field: impl Into<String>,
        value: &V,
    ) -> RepoResult<Self> {
        let value = serde_json::to_value(value)?;
        self.fields.insert(field.into(), Some(value));
        Ok(self)
    }

    /// Sets a field to `null`.
    #[must_use]
    pub fn clear(mut self, field: impl Into<String>) -> Self {
        self.fields.insert(field.into(), None);
        self
    }

    /// Returns true if the patch names no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields the patch assigns.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterates over the field names.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Checks every field against the fields `T` declares.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::UnknownField` for the first undeclared field.
    pub fn validate<T: Entity>(&self) -> RepoResult<()> {
        match self.field_names().find(|name| !T::FIELDS.contains(name)) {
            Some(field) => Err(RepoError::UnknownField {
                field: field.to_string(),
                entity: std::any::type_name::<T>(),
            }),
            None => Ok(()),
        }
    }

    /// Merges the patch into a document body.
    ///
    /// Returns true if any field changed.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::InvalidDocument` if `body` is not a JSON object.
    pub fn apply(&self, body: &mut Value) -> RepoResult<bool> {
        let object = body
            .as_object_mut()
            .ok_or_else(|| RepoError::invalid_document("patch target is not a JSON object"))?;

        let mut changed = false;
        for (field, value) in &self.fields {
            let value = value.clone().unwrap_or(Value::Null);
            if object.get(field) != Some(&value) {
                changed = true;
            }
            object.insert(field.clone(), value);
        }
        Ok(changed)
    }
}
