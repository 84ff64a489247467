//! # Error Types
//!
//! Errors shared by every forest store implementation.

use crate::entities::{Node, QualifiedHash};
use thiserror::Error;

/// Errors from parsing the primitive node types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// Hash type tag outside the known set.
    #[error("{0} is not a valid hash type")]
    InvalidHashType(u8),

    /// Node kind tag outside the known set.
    #[error("{0} is not a valid node kind")]
    InvalidNodeKind(u8),

    /// Encoded form has the wrong length for its tag.
    #[error("invalid encoded length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Errors surfaced through the [`Store`](crate::store::Store) contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A node or index key could not be encoded or decoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A value expected under an index key was absent.
    #[error("value {value} not found under key {key}")]
    NotFound { key: String, value: String },

    /// The storage backend failed.
    #[error("transaction failed: {0}")]
    Transaction(String),

    /// The type index holds a kind outside the valid set.
    #[error("unknown node kind {0}")]
    UnknownKind(u8),

    /// Some records of a batch could not be decoded.
    ///
    /// The nodes that did decode are carried alongside the failures.
    #[error("{} of {} records failed to decode: {}", .errors.len(), .errors.len() + .nodes.len(), .errors.join("; "))]
    PartialDecode { nodes: Vec<Node>, errors: Vec<String> },

    /// Copying a node into another store failed.
    #[error("copying node {id} failed: {reason}")]
    Copy { id: QualifiedHash, reason: String },
}

impl StoreError {
    /// Nodes salvaged from a partially failed batch, if any.
    pub fn salvaged_nodes(&self) -> &[Node] {
        match self {
            StoreError::PartialDecode { nodes, .. } => nodes,
            _ => &[],
        }
    }
}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidNodeKind(tag) => StoreError::UnknownKind(tag),
            other => StoreError::Serialization(other.to_string()),
        }
    }
}
