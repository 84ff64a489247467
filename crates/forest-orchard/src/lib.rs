//! # Forest Orchard
//!
//! An indexed, persistent store for forest nodes (identities, communities and
//! replies) on top of a bucketed key-value substrate.
//!
//! ## Architecture
//!
//! Every node lives in the primary bucket of its kind and is mirrored into
//! three secondary indexes, all written in one update transaction:
//!
//! ```text
//!                      ┌──────────────► Type      id -> kind
//! add(node) ──► Reply / Identity / Community
//!                      ├──────────────► Age/<kind> timestamp -> id
//!                      └──────────────► Children  parent -> id
//! ```
//!
//! Age and children keys collide routinely (shared timestamps, siblings), so
//! both indexes go through the collision-tolerant `Index`.
//!
//! ## Invariants
//!
//! | Invariant | Description |
//! |-----------|-------------|
//! | Atomic writes | A node and its index entries are committed together |
//! | Idempotent insert | Adding a stored node changes nothing |
//! | Ordered recency | `recent` is youngest first, ties in insertion order |
//! | Ordered children | `children` lists ids in insertion order |
//! | Bottom-up removal | `remove_subtree` deletes children before parents |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Configuration, key encodings, errors, index, cursors, cache
//! - `ports/` - Port traits (store API inbound, node codec outbound)
//! - `adapters/` - Substrate, file lock, bincode codec
//! - `service/` - The `Orchard` engine
//!
//! ## Usage
//!
//! ```no_run
//! use forest_orchard::{Orchard, OrchardError};
//! use forest_types::{Community, ForestNode, Identity, NodeKind, Reply, Timestamp};
//!
//! # fn main() -> Result<(), OrchardError> {
//! let orchard = Orchard::open("forest.db")?;
//!
//! let alice = Identity::new("alice", vec![], vec![], Timestamp::now());
//! let garden = Community::new(alice.id(), "garden", vec![], Timestamp::now());
//! let hello = Reply::conversation(&garden, alice.id(), "hello", Timestamp::now());
//!
//! orchard.add(&alice.into())?;
//! orchard.add(&garden.clone().into())?;
//! orchard.add(&hello.into())?;
//!
//! let latest = orchard.recent(NodeKind::Reply, 10)?;
//! let replies = orchard.children(&garden.id())?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(test)]
mod test_utils;

// Re-export key types for convenience
pub use adapters::{BincodeNodeCodec, Database, DatabaseLock, FileOptions, LockError};
pub use domain::cache::NodeCache;
pub use domain::config::{BucketNames, OrchardConfig};
pub use domain::cursor::{Direction, IndexCursor, TypedCursor};
pub use domain::errors::{CodecError, OrchardError, SubstrateError};
pub use ports::inbound::{Copiable, Paginated, RecencyQueries, Store};
pub use ports::outbound::NodeCodec;
pub use service::Orchard;
