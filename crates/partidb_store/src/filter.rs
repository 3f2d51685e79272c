//! Predicate trees handed to a store for translation.
//!
//! A [`Filter`] describes *which* items take part in a query. Stores
//! translate it into their native query language; [`Filter::matches`] is the
//! reference evaluation used by [`crate::InMemoryStore`] and is the semantics
//! every translation must agree with.
//!
//! ## Semantics
//!
//! - Field paths are dotted (`"engine.cylinders"`) and walk nested objects.
//! - A comparison against a missing field never matches.
//! - Values of different JSON types are incomparable and never match,
//!   for `Ne` as well as for ordering operators.
//! - Numbers compare numerically regardless of integer/float representation.
//! - A [`Filter::KeyIn`] key without a partition key matches its storage id
//!   in every partition; a key with one matches that partition only.

use crate::error::{StoreError, StoreResult};
use crate::key::ItemKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Comparison operator for a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl CompareOp {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

/// A predicate over stored documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Matches every item.
    All,
    /// Compares a field against a value.
    Compare {
        /// Dotted field path.
        field: String,
        /// Operator.
        op: CompareOp,
        /// Right-hand side.
        value: Value,
    },
    /// Field equals any of the values.
    In {
        /// Dotted field path.
        field: String,
        /// Candidate values.
        values: Vec<Value>,
    },
    /// Storage id is one of the given ids.
    IdIn {
        /// Storage ids.
        ids: Vec<String>,
    },
    /// Item key is one of the given keys.
    KeyIn {
        /// Item keys.
        keys: Vec<ItemKey>,
    },
    /// All sub-filters match.
    And(Vec<Filter>),
    /// At least one sub-filter matches.
    Or(Vec<Filter>),
    /// The sub-filter does not match.
    Not(Box<Filter>),
}

impl Filter {
    /// A filter that matches every item.
    #[must_use]
    pub fn all() -> Self {
        Self::All
    }

    /// Starts a comparison on a field.
    pub fn field(path: impl Into<String>) -> Field {
        Field { path: path.into() }
    }

    /// Matches items whose storage id is in `ids`.
    pub fn id_in<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::IdIn {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Matches items stored under one of `keys`.
    pub fn key_in(keys: impl IntoIterator<Item = ItemKey>) -> Self {
        Self::KeyIn {
            keys: keys.into_iter().collect(),
        }
    }

    /// Conjunction with another filter.
    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        match self {
            Self::And(mut parts) => {
                parts.push(other);
                Self::And(parts)
            }
            this => Self::And(vec![this, other]),
        }
    }

    /// Disjunction with another filter.
    #[must_use]
    pub fn or(self, other: Filter) -> Self {
        match self {
            Self::Or(mut parts) => {
                parts.push(other);
                Self::Or(parts)
            }
            this => Self::Or(vec![this, other]),
        }
    }

    /// Checks that the filter is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidQuery`] if a field path is empty or has
    /// an empty segment.
    pub fn validate(&self) -> StoreResult<()> {
        match self {
            Self::All | Self::IdIn { .. } | Self::KeyIn { .. } => Ok(()),
            Self::Compare { field, .. } | Self::In { field, .. } => validate_path(field),
            Self::And(parts) | Self::Or(parts) => parts.iter().try_for_each(Filter::validate),
            Self::Not(inner) => inner.validate(),
        }
    }

    /// Evaluates the filter against a document stored under `key`.
    #[must_use]
    pub fn matches(&self, key: &ItemKey, document: &Value) -> bool {
        match self {
            Self::All => true,
            Self::Compare { field, op, value } => lookup(document, field)
                .and_then(|actual| compare(actual, value))
                .is_some_and(|ordering| op.accepts(ordering)),
            Self::In { field, values } => lookup(document, field).is_some_and(|actual| {
                values
                    .iter()
                    .any(|v| compare(actual, v) == Some(Ordering::Equal))
            }),
            Self::IdIn { ids } => ids.iter().any(|candidate| *candidate == key.id),
            Self::KeyIn { keys } => keys.iter().any(|candidate| {
                candidate.id == key.id
                    && (candidate.partition_key.is_none()
                        || candidate.partition_key == key.partition_key)
            }),
            Self::And(parts) => parts.iter().all(|p| p.matches(key, document)),
            Self::Or(parts) => parts.iter().any(|p| p.matches(key, document)),
            Self::Not(inner) => !inner.matches(key, document),
        }
    }
}

impl std::ops::Not for Filter {
    type Output = Filter;

    fn not(self) -> Self::Output {
        Filter::Not(Box::new(self))
    }
}

/// Builder for comparisons on one field.
#[derive(Debug, Clone)]
pub struct Field {
    path: String,
}

impl Field {
    fn compare(self, op: CompareOp, value: impl Into<Value>) -> Filter {
        Filter::Compare {
            field: self.path,
            op,
            value: value.into(),
        }
    }

    /// `field == value`
    pub fn eq(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Eq, value)
    }

    /// `field != value`
    pub fn ne(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Ne, value)
    }

    /// `field < value`
    pub fn lt(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Lt, value)
    }

    /// `field <= value`
    pub fn le(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Le, value)
    }

    /// `field > value`
    pub fn gt(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Gt, value)
    }

    /// `field >= value`
    pub fn ge(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Ge, value)
    }

    /// `field` equals one of `values`.
    pub fn is_in<I, V>(self, values: I) -> Filter
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Filter::In {
            field: self.path,
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

fn validate_path(path: &str) -> StoreResult<()> {
    if path.is_empty() {
        return Err(StoreError::invalid_query("empty field path"));
    }
    if path.split('.').any(str::is_empty) {
        return Err(StoreError::invalid_query(format!(
            "field path '{path}' has an empty segment"
        )));
    }
    Ok(())
}

fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.as_object()?.get(segment))
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            (left == right).then_some(Ordering::Equal)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::PartitionKey;
    use serde_json::json;

    fn key() -> ItemKey {
        ItemKey::new("1", "Chevy")
    }

    fn camaro() -> Value {
        json!({
            "make": "Chevy",
            "model": "Camaro",
            "color": "Blue",
            "year": 1969,
            "engine": { "cylinders": 8 }
        })
    }

    #[test]
    fn all_matches_everything() {
        assert!(Filter::all().matches(&key(), &camaro()));
        assert!(Filter::all().matches(&key(), &json!({})));
    }

    #[test]
    fn equality_and_ordering() {
        let doc = camaro();
        assert!(Filter::field("make").eq("Chevy").matches(&key(), &doc));
        assert!(!Filter::field("make").eq("Audi").matches(&key(), &doc));
        assert!(Filter::field("make").ne("Audi").matches(&key(), &doc));
        assert!(Filter::field("year").lt(1970).matches(&key(), &doc));
        assert!(Filter::field("year").le(1969).matches(&key(), &doc));
        assert!(!Filter::field("year").gt(1969).matches(&key(), &doc));
        assert!(Filter::field("year").ge(1969.0).matches(&key(), &doc));
    }

    #[test]
    fn nested_paths() {
        let doc = camaro();
        assert!(Filter::field("engine.cylinders").eq(8).matches(&key(), &doc));
        assert!(!Filter::field("engine.valves").eq(8).matches(&key(), &doc));
    }

    #[test]
    fn missing_field_never_matches() {
        let doc = camaro();
        assert!(!Filter::field("trim").eq("SS").matches(&key(), &doc));
        assert!(!Filter::field("trim").ne("SS").matches(&key(), &doc));
    }

    #[test]
    fn mismatched_types_never_match() {
        let doc = camaro();
        assert!(!Filter::field("year").eq("1969").matches(&key(), &doc));
        assert!(!Filter::field("year").ne("1969").matches(&key(), &doc));
    }

    #[test]
    fn in_and_id_in() {
        let doc = camaro();
        assert!(Filter::field("color")
            .is_in(["Red", "Blue"])
            .matches(&key(), &doc));
        assert!(!Filter::field("color")
            .is_in(Vec::<String>::new())
            .matches(&key(), &doc));
        assert!(Filter::id_in(["1", "7"]).matches(&key(), &doc));
        assert!(!Filter::id_in(["7"]).matches(&key(), &doc));
    }

    #[test]
    fn key_in_pins_partition_when_given() {
        let doc = camaro();
        assert!(Filter::key_in([ItemKey::new("1", "Chevy")]).matches(&key(), &doc));
        assert!(!Filter::key_in([ItemKey::new("1", "Ford")]).matches(&key(), &doc));
        assert!(!Filter::key_in([ItemKey::new("2", "Chevy")]).matches(&key(), &doc));
        assert!(!Filter::key_in(Vec::new()).matches(&key(), &doc));
    }

    #[test]
    fn key_in_without_partition_matches_any_partition() {
        let doc = camaro();
        let unpinned = Filter::key_in([ItemKey::new("1", PartitionKey::None)]);
        assert!(unpinned.matches(&key(), &doc));
        assert!(unpinned.matches(&ItemKey::new("1", "Ford"), &doc));
        assert!(unpinned.matches(&ItemKey::new("1", PartitionKey::None), &doc));
        assert!(!unpinned.matches(&ItemKey::new("7", "Chevy"), &doc));
    }

    #[test]
    fn boolean_combinators() {
        let doc = camaro();
        let chevy = Filter::field("make").eq("Chevy");
        let green = Filter::field("color").eq("Green");

        assert!(!chevy.clone().and(green.clone()).matches(&key(), &doc));
        assert!(chevy.clone().or(green.clone()).matches(&key(), &doc));
        assert!((!green).matches(&key(), &doc));
        assert!(!(!chevy).matches(&key(), &doc));
    }

    #[test]
    fn and_flattens() {
        let f = Filter::field("a")
            .eq(1)
            .and(Filter::field("b").eq(2))
            .and(Filter::field("c").eq(3));
        match f {
            Filter::And(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_bad_paths() {
        assert!(Filter::field("make").eq("x").validate().is_ok());
        assert!(Filter::field("").eq("x").validate().is_err());
        assert!(Filter::field("engine..cylinders")
            .eq(8)
            .validate()
            .is_err());
        assert!(Filter::all()
            .and(!Filter::field("").eq(1))
            .validate()
            .is_err());
    }

    #[test]
    fn serde_roundtrip_preserves_filter() {
        let f = Filter::field("make")
            .eq("Chevy")
            .or(Filter::id_in(["a", "b"]));
        let text = serde_json::to_string(&f).unwrap();
        let back: Filter = serde_json::from_str(&text).unwrap();
        assert_eq!(f, back);
    }
}
