//! # Outbound Ports (Driven Ports)
//!
//! Dependencies required by the orchard engine.

use crate::domain::errors::CodecError;
use forest_types::{Node, NodeKind};

/// Binary encoding of nodes as stored in the primary buckets.
///
/// Production: `BincodeNodeCodec` (adapters/serializer)
///
/// Encodings must be deterministic and must carry the node kind, so that
/// `kind_of` can classify a raw record without the type index.
pub trait NodeCodec: Send + Sync {
    fn encode(&self, node: &Node) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, bytes: &[u8]) -> Result<Node, CodecError>;

    /// Recover the kind of an encoded record without decoding it fully.
    fn kind_of(&self, bytes: &[u8]) -> Result<NodeKind, CodecError>;
}
