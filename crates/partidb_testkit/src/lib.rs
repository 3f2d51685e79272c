//! # partidb Testkit
//!
//! Test utilities for partidb.
//!
//! This crate provides:
//! - The automobile fixture entity and data set
//! - Repository helpers over an instrumented in-memory store
//! - A fault-injecting store wrapper
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use partidb_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn deletes_chevys() {
//!     let garage = TestRepository::seeded().await;
//!     let outcome = garage
//!         .writer()
//!         .delete_where(&Filter::field("Make").eq("Chevy"))
//!         .await
//!         .unwrap();
//!     assert_eq!(outcome.count(), 2);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
