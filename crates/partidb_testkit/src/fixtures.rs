//! Test fixtures and repository helpers.
//!
//! The fixture data set is a small garage of automobiles partitioned by
//! make. Two of the six cars are Chevys and two are blue, which the bulk
//! scenarios rely on.

use crate::faults::FaultyStore;
use partidb_core::{DelimitedId, Entity, Repository, RepositoryConfig, WriteRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The fixture entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Automobile {
    /// Identifier.
    pub id: String,
    /// Manufacturer; also the partition key.
    pub make: String,
    /// Model name.
    pub model: String,
    /// Paint color.
    pub color: String,
    /// Model year.
    pub year: i32,
}

impl Automobile {
    /// Creates an automobile.
    pub fn new(id: &str, make: &str, model: &str, color: &str, year: i32) -> Self {
        Self {
            id: id.to_string(),
            make: make.to_string(),
            model: model.to_string(),
            color: color.to_string(),
            year,
        }
    }

    /// The identifier a [`partidb_core::DelimitedId`] strategy maps to this
    /// car's key.
    pub fn delimited_id(&self) -> String {
        format!("{}/{}", self.make, self.id)
    }
}

impl Entity for Automobile {
    type Id = String;
    const FIELDS: &'static [&'static str] = &["Id", "Make", "Model", "Color", "Year"];

    fn id(&self) -> &String {
        &self.id
    }

    fn partition_key(&self) -> Option<String> {
        Some(self.make.clone())
    }
}

/// The six-car fixture set.
pub fn automobiles() -> Vec<Automobile> {
    vec![
        Automobile::new("car-1", "Chevy", "Camaro", "Blue", 1969),
        Automobile::new("car-2", "Pontiac", "Firebird", "Black", 1972),
        Automobile::new("car-3", "Chevy", "Corvette", "Green", 1964),
        Automobile::new("car-4", "Audi", "S5", "Blue", 2021),
        Automobile::new("car-5", "Studebaker", "Speedster", "Black", 1914),
        Automobile::new("car-6", "Arrow", "Glow", "Green", 1917),
    ]
}

/// A repository of automobiles over an instrumented in-memory store.
///
/// Reads resolve identifiers with a `"<make>/<id>"` [`DelimitedId`]
/// strategy; see [`Automobile::delimited_id`].
pub struct TestRepository {
    /// The repository.
    pub repo: Repository<Automobile>,
    /// The store behind it.
    pub store: Arc<FaultyStore>,
}

impl TestRepository {
    /// Creates an empty repository with default configuration.
    pub fn empty() -> Self {
        Self::with_config(RepositoryConfig::default())
    }

    /// Creates an empty repository with `config`.
    pub fn with_config(config: RepositoryConfig) -> Self {
        let store = Arc::new(FaultyStore::new());
        let repo = Repository::<Automobile>::new(store.clone())
            .with_config(config)
            .with_strategy(DelimitedId::default());
        Self { repo, store }
    }

    /// Creates a repository holding the six fixture cars.
    pub async fn seeded() -> Self {
        Self::seeded_with(RepositoryConfig::default()).await
    }

    /// Creates a repository with `config` holding the six fixture cars.
    pub async fn seeded_with(config: RepositoryConfig) -> Self {
        let test_repo = Self::with_config(config);
        test_repo
            .repo
            .writer()
            .insert_many(&automobiles())
            .await
            .expect("Failed to seed automobiles");
        test_repo
    }

    /// Creates a repository holding `count` generated cars spread over
    /// `makes` partitions.
    pub async fn fleet(count: usize, makes: usize, config: RepositoryConfig) -> Self {
        let test_repo = Self::with_config(config);
        let makes = makes.max(1);
        let cars: Vec<Automobile> = (0..count)
            .map(|i| {
                Automobile::new(
                    &format!("fleet-{i:04}"),
                    &format!("Make{}", i % makes),
                    "Model",
                    if i % 2 == 0 { "Blue" } else { "Red" },
                    1900 + (i % 120) as i32,
                )
            })
            .collect();
        test_repo
            .repo
            .writer()
            .insert_many(&cars)
            .await
            .expect("Failed to seed fleet");
        test_repo
    }
}

impl std::ops::Deref for TestRepository {
    type Target = Repository<Automobile>;

    fn deref(&self) -> &Self::Target {
        &self.repo
    }
}
