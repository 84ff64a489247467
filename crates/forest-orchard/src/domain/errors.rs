//! # Domain Errors
//!
//! Error types for the orchard.
//!
//! ## Layers
//!
//! - `SubstrateError`: the bucketed key-value store failed.
//! - `CodecError`: a node or index key could not be (de)serialized.
//! - `OrchardError`: an engine operation failed; wraps the above with the
//!   step that was running.
//!
//! Every `OrchardError` converts into the shared `StoreError` so the orchard
//! can stand behind the `Store` trait.

use crate::adapters::lock::LockError;
use forest_types::{Node, NodeKind, QualifiedHash, StoreError, TypeError};
use thiserror::Error;

/// Errors from the bucketed key-value substrate.
#[derive(Debug, Error)]
pub enum SubstrateError {
    /// A top-level bucket the caller relies on does not exist.
    #[error("bucket {0} not found")]
    BucketNotFound(String),

    /// Creating a bucket whose name is already taken by a bucket.
    #[error("bucket {0} already exists")]
    BucketExists(String),

    /// Value operation on a bucket key, or bucket operation on a value key.
    #[error("incompatible value")]
    IncompatibleValue,

    /// Empty keys are not addressable.
    #[error("key required")]
    KeyRequired,

    /// Reading or writing the database file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The database file is not a valid snapshot.
    #[error("database file corrupted: {0}")]
    Corrupted(String),
}

impl SubstrateError {
    pub(crate) fn bucket_not_found(name: &[u8]) -> Self {
        SubstrateError::BucketNotFound(String::from_utf8_lossy(name).into_owned())
    }
}

/// Errors from encoding or decoding records and index keys.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encoding failed: {0}")]
    Encode(String),

    #[error("decoding failed: {0}")]
    Decode(String),

    /// Record too short to carry a kind tag.
    #[error("record of {len} bytes is too short")]
    Truncated { len: usize },

    /// Leading record tag is not a node kind.
    #[error("record tag {0} is not a node kind")]
    UnknownTag(u32),

    /// Stored id does not match the recomputed content hash.
    #[error("content hash mismatch for node {stored}")]
    IdMismatch { stored: QualifiedHash },

    /// Record decoded to a different kind than the one requested.
    #[error("expected a {expected} record, found a {found}")]
    KindMismatch { expected: NodeKind, found: NodeKind },

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Errors from orchard operations.
#[derive(Debug, Error)]
pub enum OrchardError {
    /// Encoding or decoding failed.
    #[error("serialization error while {context}: {source}")]
    Serialization {
        context: &'static str,
        #[source]
        source: CodecError,
    },

    /// `delete_by_value` found no such value under the key.
    #[error("index key {key} does not hold value {value}")]
    NotFound { key: String, value: String },

    /// The substrate failed; the transaction was rolled back.
    #[error("transaction error while {context}: {source}")]
    Transaction {
        context: &'static str,
        #[source]
        source: SubstrateError,
    },

    /// The type index names a kind outside the valid set.
    #[error("unknown node kind {0} in type index")]
    UnknownKind(u8),

    /// An index entry points at an id with no primary record.
    #[error("index entry {id} has no primary record")]
    DanglingEntry { id: String },

    /// Some records of a recency scan failed to decode; `nodes` holds the rest.
    #[error("{} of {} records failed to decode", .errors.len(), .errors.len() + .nodes.len())]
    PartialDecode {
        nodes: Vec<Node>,
        errors: Vec<OrchardError>,
    },

    /// The target store rejected a node during `copy_into`.
    #[error("copying node {id} failed: {source}")]
    Copy {
        id: QualifiedHash,
        #[source]
        source: StoreError,
    },

    /// Another process holds the database.
    #[error(transparent)]
    Lock(#[from] LockError),
}

impl From<SubstrateError> for OrchardError {
    fn from(source: SubstrateError) -> Self {
        OrchardError::Transaction {
            context: "committing",
            source,
        }
    }
}

impl From<OrchardError> for StoreError {
    fn from(err: OrchardError) -> Self {
        match err {
            OrchardError::Serialization { .. } | OrchardError::DanglingEntry { .. } => {
                StoreError::Serialization(err.to_string())
            }
            OrchardError::NotFound { key, value } => StoreError::NotFound { key, value },
            OrchardError::Transaction { .. } | OrchardError::Lock(_) => {
                StoreError::Transaction(err.to_string())
            }
            OrchardError::UnknownKind(tag) => StoreError::UnknownKind(tag),
            OrchardError::PartialDecode { nodes, errors } => StoreError::PartialDecode {
                nodes,
                errors: errors.iter().map(ToString::to_string).collect(),
            },
            OrchardError::Copy { id, source } => StoreError::Copy {
                id,
                reason: source.to_string(),
            },
        }
    }
}

/// Attach the running step to a lower-level error.
pub(crate) trait Context<T> {
    fn context(self, context: &'static str) -> Result<T, OrchardError>;
}

impl<T> Context<T> for Result<T, SubstrateError> {
    fn context(self, context: &'static str) -> Result<T, OrchardError> {
        self.map_err(|source| OrchardError::Transaction { context, source })
    }
}

impl<T> Context<T> for Result<T, CodecError> {
    fn context(self, context: &'static str) -> Result<T, OrchardError> {
        self.map_err(|source| OrchardError::Serialization { context, source })
    }
}
