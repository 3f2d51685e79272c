//! # partidb Store
//!
//! Document store contract and reference implementation for partidb.
//!
//! This crate fixes what the repository layer needs from a partitioned
//! document store. The store itself is an **external collaborator**: it owns
//! all persisted state, translates [`Filter`]s into its own query language and
//! issues version tags for optimistic concurrency.
//!
//! ## Design Principles
//!
//! - Every item is addressed by an [`ItemKey`] (storage id + partition key)
//! - Every call is a single round trip with no cross-call transactions
//! - Query results arrive through a paged, forward-only [`PageCursor`]
//! - Stores must be `Send + Sync`; one handle is shared by concurrent tasks
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral data
//!
//! ## Example
//!
//! ```rust
//! use partidb_store::{DocumentStore, Filter, InMemoryStore, ItemKey, QueryOptions};
//! use serde_json::json;
//!
//! # async fn run() -> partidb_store::StoreResult<()> {
//! let store = InMemoryStore::new();
//! store.create_item(&ItemKey::new("1", "Chevy"), json!({ "model": "Camaro" })).await?;
//!
//! let mut cursor = store
//!     .query(&Filter::field("model").eq("Camaro"), QueryOptions::default())
//!     .await?;
//! while cursor.has_more_results() {
//!     for doc in cursor.next_page().await? {
//!         println!("{}", doc.key);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod filter;
mod key;
mod memory;
mod store;

pub use error::{StoreError, StoreResult};
pub use filter::{CompareOp, Field, Filter};
pub use key::{ETag, ItemKey, PartitionKey};
pub use memory::InMemoryStore;
pub use store::{
    DocumentStore, PageCursor, QueryOptions, StoredDocument, UpsertOutcome, WriteCondition,
};
