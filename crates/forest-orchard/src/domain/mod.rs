//! # Domain Layer
//!
//! Storage-independent logic of the orchard.
//!
//! ## Modules
//!
//! - `config` - Bucket names and engine configuration
//! - `keys` - Byte encodings of index keys and values
//! - `errors` - Domain error types
//! - `index` - Collision-tolerant index over one bucket
//! - `cursor` - Index cursors joined against primary buckets
//! - `cache` - Bounded read cache of decoded nodes

pub mod cache;
pub mod config;
pub mod cursor;
pub mod errors;
pub mod index;
pub mod keys;
