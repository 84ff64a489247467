//! # Index Keys
//!
//! Byte encodings of the values used as index keys and index values.
//!
//! | Value | Encoding |
//! |-------|----------|
//! | node id | canonical `QualifiedHash` bytes |
//! | timestamp | 8 bytes, big-endian |
//! | node kind | 1 byte |
//! | collision sub-key | 8 bytes, big-endian sequence number |

use crate::domain::errors::{CodecError, OrchardError};
use forest_types::{NodeKind, QualifiedHash, Timestamp};

pub fn encode_id(id: &QualifiedHash) -> Vec<u8> {
    id.to_bytes()
}

pub fn decode_id(bytes: &[u8]) -> Result<QualifiedHash, CodecError> {
    Ok(QualifiedHash::from_bytes(bytes)?)
}

pub fn encode_timestamp(ts: Timestamp) -> [u8; 8] {
    ts.to_be_bytes()
}

pub fn encode_kind(kind: NodeKind) -> [u8; 1] {
    [kind.tag()]
}

/// Decode a type-index value. Anything but a single valid tag byte means the
/// index is corrupt.
pub fn decode_kind(bytes: &[u8]) -> Result<NodeKind, OrchardError> {
    match bytes {
        [tag] => NodeKind::from_tag(*tag).map_err(|_| OrchardError::UnknownKind(*tag)),
        _ => Err(OrchardError::Serialization {
            context: "reading type index",
            source: CodecError::Decode(format!("kind entry of {} bytes", bytes.len())),
        }),
    }
}

pub fn sequence_key(seq: u64) -> [u8; 8] {
    seq.to_be_bytes()
}
