//! # partidb Core
//!
//! Partition-aware repository engine for partidb.
//!
//! This crate provides:
//! - Identifier strategies and partition resolution
//! - Lazy entity streams over paged store cursors
//! - Typed readers (point, predicate and multi-id reads)
//! - Typed writers (insert, delete, guarded and unguarded updates)
//! - Bulk predicate mutation with bounded concurrency and per-item outcomes
//!
//! # Partitions
//!
//! Every store call is addressed by an [`ItemKey`](partidb_store::ItemKey).
//! Reads resolve it from the identifier (see [`PartitionResolver`]); writes
//! resolve it from the entity's [`Entity::partition_key`].
//!
//! # Bulk operations
//!
//! `delete_where`, `patch_where` and `update_with` fan candidates out to
//! concurrent tasks and return a [`BulkOutcome`]. A failing item never stops
//! the pass; it is reported with its key.
//!
//! ```rust,ignore
//! let outcome = repo
//!     .writer()
//!     .patch_where(&Patch::new().set("year", 1970), &Filter::field("color").eq("Blue"))
//!     .await?;
//! assert_eq!(outcome.count(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod bulk;
mod cancel;
mod config;
mod entity;
mod error;
mod patch;
mod reader;
mod repository;
mod resolver;
mod strategy;
mod stream;
mod writer;

pub use bulk::{BulkOutcome, ItemFailure, ScanControl, Verdict};
pub use cancel::CancelToken;
pub use config::RepositoryConfig;
pub use entity::{DocumentId, Entity, PartitionedId};
pub use error::{RepoError, RepoResult};
pub use patch::Patch;
pub use reader::Reader;
pub use repository::{ReadRepository, Repository, WriteRepository};
pub use resolver::PartitionResolver;
pub use strategy::{DelimitedId, FixedPartition, IdentifierStrategy, ResolvedId};
pub use stream::{DocumentStream, EntityStream};
pub use writer::Writer;

pub use partidb_store::{Filter, ItemKey, PartitionKey};
