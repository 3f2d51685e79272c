//! Property-based test generators using proptest.
//!
//! Generated fleets always have unique ids, so every car in a fleet maps to
//! its own item key.

use crate::fixtures::Automobile;
use proptest::prelude::*;

/// Makes the generators draw from.
pub const MAKES: &[&str] = &["Chevy", "Pontiac", "Audi", "Studebaker", "Arrow", "Ford"];

/// Colors the generators draw from.
pub const COLORS: &[&str] = &["Blue", "Black", "Green", "Red", "White"];

/// Strategy for generating a make.
pub fn make_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(MAKES).prop_map(str::to_string)
}

/// Strategy for generating a color.
pub fn color_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(COLORS).prop_map(str::to_string)
}

/// Strategy for generating a model year.
pub fn year_strategy() -> impl Strategy<Value = i32> {
    1900..2030i32
}

/// Strategy for generating one automobile with the given id.
pub fn automobile_strategy(id: String) -> impl Strategy<Value = Automobile> {
    (
        make_strategy(),
        prop::string::string_regex("[A-Z][a-z]{2,9}").expect("Invalid regex"),
        color_strategy(),
        year_strategy(),
    )
        .prop_map(move |(make, model, color, year)| Automobile {
            id: id.clone(),
            make,
            model,
            color,
            year,
        })
}

/// Strategy for generating up to `max_len` automobiles with unique ids.
pub fn fleet_strategy(max_len: usize) -> impl Strategy<Value = Vec<Automobile>> {
    (0..=max_len).prop_flat_map(|len| {
        (0..len)
            .map(|i| automobile_strategy(format!("gen-{i:03}")))
            .collect::<Vec<_>>()
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 64,
            max_shrink_iters: 500,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 16,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 5000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
