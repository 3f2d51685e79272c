//! Repository configuration.

/// Configuration for a repository.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Maximum number of per-item tasks a bulk operation keeps in flight.
    pub bulk_concurrency: usize,

    /// Page size requested from the store for predicate queries.
    pub page_size: usize,

    /// Extra read-evaluate-write rounds a guarded update makes when the
    /// item changes underneath it.
    pub guard_retries: u32,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            bulk_concurrency: 16,
            page_size: 100,
            guard_retries: 3,
        }
    }
}

impl RepositoryConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bulk concurrency limit. Values below 1 are treated as 1.
    #[must_use]
    pub const fn bulk_concurrency(mut self, limit: usize) -> Self {
        self.bulk_concurrency = if limit == 0 { 1 } else { limit };
        self
    }

    /// Sets the query page size. Values below 1 are treated as 1.
    #[must_use]
    pub const fn page_size(mut self, size: usize) -> Self {
        self.page_size = if size == 0 { 1 } else { size };
        self
    }

    /// Sets the number of guard retries.
    #[must_use]
    pub const fn guard_retries(mut self, retries: u32) -> Self {
        self.guard_retries = retries;
        self
    }
}
