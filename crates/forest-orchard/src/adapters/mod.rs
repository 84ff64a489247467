//! # Adapters Module
//!
//! Concrete implementations behind the orchard's ports.
//!
//! ## Modules
//!
//! - `storage`: the bucketed key-value substrate (in-memory or file-backed)
//! - `lock`: database process locking (singleton guard)
//! - `serializer`: the bincode `NodeCodec`

pub mod lock;
pub mod serializer;
pub mod storage;

pub use lock::{DatabaseLock, LockError};
pub use serializer::BincodeNodeCodec;
pub use storage::{Database, FileOptions};
