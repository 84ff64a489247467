//! Storage Adapters
//!
//! The bucketed key-value substrate the orchard persists into: nested,
//! byte-ordered buckets with per-bucket sequence counters, read and write
//! transactions, and an optional file made of a snapshot plus a write-ahead
//! journal.

mod bucket;
mod cursor;
mod database;
mod journal;

pub use bucket::{BucketMut, BucketRef};
pub use cursor::{Cursor, CursorItem};
pub use database::{Database, FileOptions, ReadTx, WriteTx};
