use crate::domain::errors::CodecError;
use crate::ports::outbound::NodeCodec;
use forest_types::{ForestNode, Node, NodeKind};

/// Width of the enum tag bincode writes ahead of every `Node`.
const TAG_LEN: usize = 4;

/// Node codec using bincode.
///
/// The encoding starts with the `Node` variant index as a little-endian
/// `u32`, which doubles as the kind tag.
#[derive(Debug, Clone, Copy)]
pub struct BincodeNodeCodec {
    verify: bool,
}

impl Default for BincodeNodeCodec {
    fn default() -> Self {
        Self { verify: true }
    }
}

impl BincodeNodeCodec {
    /// Codec that checks every decoded id against the node's content hash.
    pub fn verified() -> Self {
        Self::default()
    }

    /// Codec that trusts stored ids. Meant for bulk imports of known-good data.
    pub fn unchecked() -> Self {
        Self { verify: false }
    }

    pub fn verifies(&self) -> bool {
        self.verify
    }
}

impl NodeCodec for BincodeNodeCodec {
    fn encode(&self, node: &Node) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(node).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Node, CodecError> {
        let node: Node =
            bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))?;
        if self.verify && !node.verify_id() {
            return Err(CodecError::IdMismatch { stored: node.id() });
        }
        Ok(node)
    }

    fn kind_of(&self, bytes: &[u8]) -> Result<NodeKind, CodecError> {
        let Some(prefix) = bytes.first_chunk::<TAG_LEN>() else {
            return Err(CodecError::Truncated { len: bytes.len() });
        };
        let tag = u32::from_le_bytes(*prefix);
        u8::try_from(tag)
            .ok()
            .and_then(|tag| NodeKind::from_tag(tag).ok())
            .ok_or(CodecError::UnknownTag(tag))
    }
}
