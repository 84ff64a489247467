//! # Forest Types Crate
//!
//! The node model and store contract shared by every forest store.
//!
//! ## Contents
//!
//! - `entities`: qualified hashes, timestamps, node kinds and the three node
//!   variants (`Identity`, `Community`, `Reply`) behind the `Node` enum.
//! - `store`: the `Store`, `Paginated` and `Copiable` traits.
//! - `memory`: an unbounded in-memory `Store`.
//! - `errors`: `TypeError` and `StoreError`.
//!
//! ## Design Principles
//!
//! - **Content Addressing**: node ids are computed by the constructors and
//!   never supplied by callers.
//! - **Immutability**: nodes expose accessors only; stores never mutate them.

pub mod entities;
pub mod errors;
pub mod memory;
pub mod store;

pub use entities::*;
pub use errors::*;
pub use memory::MemoryStore;
pub use store::{Copiable, Paginated, Store};
