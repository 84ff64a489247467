//! # Database Process Locking
//!
//! Prevents multiple processes from opening the same database file.
//!
//! ## Modules
//!
//! - `flock`: file lock implementation using fs2

mod flock;
#[cfg(test)]
mod tests;

pub use flock::{DatabaseLock, LockError};
