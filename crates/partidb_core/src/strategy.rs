//! Identifier strategies.
//!
//! A strategy turns an identifier that does not describe its own partition
//! into a `(storage id, partition key)` pair. Strategies are total: an
//! identifier they cannot map comes back as its `Display` form with an empty
//! partition key.

use std::fmt;

/// Output of an [`IdentifierStrategy`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedId {
    /// Storage id.
    pub id: String,
    /// Partition key. Blank means "no partition key".
    pub partition_key: String,
}

impl ResolvedId {
    /// Creates a resolved pair.
    pub fn new(id: impl Into<String>, partition_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            partition_key: partition_key.into(),
        }
    }

    /// The fallback mapping: the identifier's own text, no partition key.
    pub fn unmapped(id: &impl fmt::Display) -> Self {
        Self::new(id.to_string(), String::new())
    }
}

/// Maps identifiers of type `I` to storage ids and partition keys.
///
/// Injected once per repository and shared by every operation, so it must
/// be stateless (or internally synchronized) and free of side effects.
/// Any `Fn(&I) -> ResolvedId` closure is a strategy.
pub trait IdentifierStrategy<I>: Send + Sync {
    /// Resolves an identifier.
    fn resolve(&self, id: &I) -> ResolvedId;
}

impl<I, F> IdentifierStrategy<I> for F
where
    F: Fn(&I) -> ResolvedId + Send + Sync,
{
    fn resolve(&self, id: &I) -> ResolvedId {
        self(id)
    }
}

/// Places every identifier in one fixed partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedPartition {
    partition_key: String,
}

impl FixedPartition {
    /// Creates a strategy bound to `partition_key`.
    pub fn new(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
        }
    }
}

impl<I: fmt::Display> IdentifierStrategy<I> for FixedPartition {
    fn resolve(&self, id: &I) -> ResolvedId {
        ResolvedId::new(id.to_string(), self.partition_key.clone())
    }
}

/// Splits `"<partition><separator><id>"` identifiers.
///
/// The split happens at the first separator. Without a separator the whole
/// text is the id and the partition key is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedId {
    separator: String,
}

impl DelimitedId {
    /// Creates a strategy splitting on `separator`.
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }
}

impl Default for DelimitedId {
    fn default() -> Self {
        Self::new("/")
    }
}

impl<I: fmt::Display> IdentifierStrategy<I> for DelimitedId {
    fn resolve(&self, id: &I) -> ResolvedId {
        let text = id.to_string();
        if self.separator.is_empty() {
            return ResolvedId::unmapped(&text);
        }
        match text.split_once(self.separator.as_str()) {
            Some((partition_key, rest)) => ResolvedId::new(rest, partition_key),
            None => ResolvedId::unmapped(&text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fixed_partition_keeps_id() {
        let strategy = FixedPartition::new("Chevy");
        assert_eq!(
            IdentifierStrategy::<String>::resolve(&strategy, &"car-1".to_string()),
            ResolvedId::new("car-1", "Chevy")
        );
        assert_eq!(
            IdentifierStrategy::<u64>::resolve(&strategy, &7),
            ResolvedId::new("7", "Chevy")
        );
    }

    #[test]
    fn delimited_splits_at_first_separator() {
        let strategy = DelimitedId::new(":");
        let resolved = IdentifierStrategy::<String>::resolve(&strategy, &"Chevy:car:1".to_string());
        assert_eq!(resolved, ResolvedId::new("car:1", "Chevy"));
    }

    #[test]
    fn delimited_without_separator_falls_back() {
        let strategy = DelimitedId::default();
        let resolved = IdentifierStrategy::<String>::resolve(&strategy, &"car-1".to_string());
        assert_eq!(resolved, ResolvedId::new("car-1", ""));
    }

    #[test]
    fn delimited_with_empty_separator_falls_back() {
        let strategy = DelimitedId::new("");
        let resolved = IdentifierStrategy::<String>::resolve(&strategy, &"a/b".to_string());
        assert_eq!(resolved, ResolvedId::new("a/b", ""));
    }

    proptest! {
        #[test]
        fn delimited_recovers_partition_and_id(
            partition in "[A-Za-z0-9_-]{1,12}",
            id in "[A-Za-z0-9/_-]{0,16}",
        ) {
            let strategy = DelimitedId::default();
            let text = format!("{partition}/{id}");
            let resolved = IdentifierStrategy::<String>::resolve(&strategy, &text);
            prop_assert_eq!(resolved, ResolvedId::new(id, partition));
        }
    }

    #[test]
    fn closures_are_strategies() {
        let strategy = |id: &u64| ResolvedId::new(id.to_string(), format!("bucket-{}", id % 4));
        assert_eq!(strategy.resolve(&9), ResolvedId::new("9", "bucket-1"));
    }
}
