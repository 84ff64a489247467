//! # Forest Entities
//!
//! The node model shared by every forest store.
//!
//! ## Node Kinds
//!
//! - **Identity**: a root node naming a participant.
//! - **Community**: a root node grouping conversations.
//! - **Reply**: a node attached to a parent (a community or another reply).
//!
//! Nodes are immutable and content-addressed: the id of a node is the
//! SHA-512/256 digest of its canonical content, computed by the constructors.
//!
//! ## Binary Forms
//!
//! | Type | Encoding |
//! |------|----------|
//! | `QualifiedHash` | `tag:u8 \| length:u16 BE \| digest` |
//! | `Timestamp` | `u64` big-endian (milliseconds since the UNIX epoch) |
//! | `NodeKind` | one byte: identity 0, community 1, reply 2 |

use crate::errors::TypeError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512_256};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Length of a SHA-512/256 digest in bytes.
pub const SHA512_256_DIGEST_LENGTH: usize = 32;

/// Prefix mixed into every content hash so node ids never collide with
/// digests of unrelated data.
const CONTENT_HASH_DOMAIN: &[u8] = b"forest-node/v1";

// =============================================================================
// HASHES
// =============================================================================

/// Algorithm tag of a [`QualifiedHash`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum HashType {
    /// The null hash, used as the parent of root nodes.
    Null = 0,
    /// SHA-512 truncated to 256 bits.
    Sha512_256 = 1,
}

impl HashType {
    /// Wire tag of this hash type.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Parse a wire tag.
    pub fn from_tag(tag: u8) -> Result<Self, TypeError> {
        match tag {
            0 => Ok(HashType::Null),
            1 => Ok(HashType::Sha512_256),
            other => Err(TypeError::InvalidHashType(other)),
        }
    }

    /// Digest length mandated by this hash type.
    pub fn digest_length(self) -> usize {
        match self {
            HashType::Null => 0,
            HashType::Sha512_256 => SHA512_256_DIGEST_LENGTH,
        }
    }
}

/// A fixed-length, type-tagged content hash. The primary key of every node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedHash {
    hash_type: HashType,
    digest: [u8; SHA512_256_DIGEST_LENGTH],
}

impl QualifiedHash {
    /// Length of the canonical encoding header (tag + length).
    const HEADER_LEN: usize = 3;

    /// The designated null hash.
    pub const fn null() -> Self {
        Self {
            hash_type: HashType::Null,
            digest: [0; SHA512_256_DIGEST_LENGTH],
        }
    }

    /// Wrap an existing SHA-512/256 digest.
    pub const fn sha512_256(digest: [u8; SHA512_256_DIGEST_LENGTH]) -> Self {
        Self {
            hash_type: HashType::Sha512_256,
            digest,
        }
    }

    /// Hash arbitrary bytes with SHA-512/256.
    pub fn of_bytes(data: &[u8]) -> Self {
        Self::sha512_256(Sha512_256::digest(data).into())
    }

    pub fn is_null(&self) -> bool {
        self.hash_type == HashType::Null
    }

    pub fn hash_type(&self) -> HashType {
        self.hash_type
    }

    /// The significant digest bytes (empty for the null hash).
    pub fn digest(&self) -> &[u8] {
        &self.digest[..self.hash_type.digest_length()]
    }

    /// Canonical binary form: `tag | length (u16 BE) | digest`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let digest = self.digest();
        let mut out = Vec::with_capacity(Self::HEADER_LEN + digest.len());
        out.push(self.hash_type.tag());
        out.extend_from_slice(&(digest.len() as u16).to_be_bytes());
        out.extend_from_slice(digest);
        out
    }

    /// Parse the canonical binary form. The input must be consumed exactly.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.len() < Self::HEADER_LEN {
            return Err(TypeError::InvalidLength {
                expected: Self::HEADER_LEN,
                actual: bytes.len(),
            });
        }
        let hash_type = HashType::from_tag(bytes[0])?;
        let declared = u16::from_be_bytes([bytes[1], bytes[2]]) as usize;
        let expected = hash_type.digest_length();
        if declared != expected || bytes.len() != Self::HEADER_LEN + expected {
            return Err(TypeError::InvalidLength {
                expected: Self::HEADER_LEN + expected,
                actual: bytes.len(),
            });
        }
        let mut digest = [0u8; SHA512_256_DIGEST_LENGTH];
        digest[..expected].copy_from_slice(&bytes[Self::HEADER_LEN..]);
        Ok(Self { hash_type, digest })
    }
}

impl Default for QualifiedHash {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for QualifiedHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.hash_type {
            HashType::Null => write!(f, "null"),
            HashType::Sha512_256 => write!(f, "{}", hex::encode(self.digest())),
        }
    }
}

impl fmt::Debug for QualifiedHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.hash_type {
            HashType::Null => write!(f, "QualifiedHash(null)"),
            HashType::Sha512_256 => {
                write!(f, "QualifiedHash({}…)", hex::encode(&self.digest[..4]))
            }
        }
    }
}

// =============================================================================
// TIMESTAMPS
// =============================================================================

/// Creation time of a node in milliseconds since the UNIX epoch.
///
/// Supplied by the author, never by the store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Truncate a `SystemTime` to millisecond precision. Times before the
    /// epoch clamp to zero.
    pub fn from_system_time(time: SystemTime) -> Self {
        let millis = time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self(millis)
    }

    pub fn to_system_time(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.0)
    }

    /// Big-endian form; byte order equals chronological order.
    pub fn to_be_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

// =============================================================================
// NODE KINDS
// =============================================================================

/// Discriminator of the three node variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeKind {
    Identity = 0,
    Community = 1,
    Reply = 2,
}

impl NodeKind {
    /// Every kind, in tag order.
    pub const ALL: [NodeKind; 3] = [NodeKind::Identity, NodeKind::Community, NodeKind::Reply];

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Result<Self, TypeError> {
        match tag {
            0 => Ok(NodeKind::Identity),
            1 => Ok(NodeKind::Community),
            2 => Ok(NodeKind::Reply),
            other => Err(TypeError::InvalidNodeKind(other)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Identity => "identity",
            NodeKind::Community => "community",
            NodeKind::Reply => "reply",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// NODE CAPABILITY
// =============================================================================

/// The accessors a store needs from a node.
pub trait ForestNode {
    fn id(&self) -> QualifiedHash;
    /// Parent id; roots return the null hash.
    fn parent_id(&self) -> QualifiedHash;
    fn created_at(&self) -> Timestamp;
    fn kind(&self) -> NodeKind;
}

/// Incremental canonical encoder feeding SHA-512/256.
///
/// Every field is length-prefixed so adjacent fields cannot run together.
struct ContentHasher(Sha512_256);

impl ContentHasher {
    fn new(kind: NodeKind) -> Self {
        let mut hasher = Sha512_256::new();
        hasher.update(CONTENT_HASH_DOMAIN);
        hasher.update([kind.tag()]);
        Self(hasher)
    }

    fn bytes(mut self, data: &[u8]) -> Self {
        self.0.update((data.len() as u32).to_be_bytes());
        self.0.update(data);
        self
    }

    fn hash(self, hash: &QualifiedHash) -> Self {
        self.bytes(&hash.to_bytes())
    }

    fn timestamp(self, ts: Timestamp) -> Self {
        self.bytes(&ts.to_be_bytes())
    }

    fn finish(self) -> QualifiedHash {
        QualifiedHash::sha512_256(self.0.finalize().into())
    }
}

// =============================================================================
// IDENTITY
// =============================================================================

/// A root node naming a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    id: QualifiedHash,
    created: Timestamp,
    name: String,
    public_key: Vec<u8>,
    metadata: Vec<u8>,
}

impl Identity {
    pub fn new(
        name: impl Into<String>,
        public_key: Vec<u8>,
        metadata: Vec<u8>,
        created: Timestamp,
    ) -> Self {
        let mut identity = Self {
            id: QualifiedHash::null(),
            created,
            name: name.into(),
            public_key,
            metadata,
        };
        identity.id = identity.content_hash();
        identity
    }

    fn content_hash(&self) -> QualifiedHash {
        ContentHasher::new(NodeKind::Identity)
            .timestamp(self.created)
            .bytes(self.name.as_bytes())
            .bytes(&self.public_key)
            .bytes(&self.metadata)
            .finish()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }
}

impl ForestNode for Identity {
    fn id(&self) -> QualifiedHash {
        self.id
    }

    fn parent_id(&self) -> QualifiedHash {
        QualifiedHash::null()
    }

    fn created_at(&self) -> Timestamp {
        self.created
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Identity
    }
}

// =============================================================================
// COMMUNITY
// =============================================================================

/// A root node grouping conversations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    id: QualifiedHash,
    created: Timestamp,
    author: QualifiedHash,
    name: String,
    metadata: Vec<u8>,
}

impl Community {
    pub fn new(
        author: QualifiedHash,
        name: impl Into<String>,
        metadata: Vec<u8>,
        created: Timestamp,
    ) -> Self {
        let mut community = Self {
            id: QualifiedHash::null(),
            created,
            author,
            name: name.into(),
            metadata,
        };
        community.id = community.content_hash();
        community
    }

    fn content_hash(&self) -> QualifiedHash {
        ContentHasher::new(NodeKind::Community)
            .timestamp(self.created)
            .hash(&self.author)
            .bytes(self.name.as_bytes())
            .bytes(&self.metadata)
            .finish()
    }

    pub fn author(&self) -> QualifiedHash {
        self.author
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }
}

impl ForestNode for Community {
    fn id(&self) -> QualifiedHash {
        self.id
    }

    fn parent_id(&self) -> QualifiedHash {
        QualifiedHash::null()
    }

    fn created_at(&self) -> Timestamp {
        self.created
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Community
    }
}

// =============================================================================
// REPLY
// =============================================================================

/// Every field of a reply except its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyParts {
    pub community_id: QualifiedHash,
    /// Root reply of the conversation; null for a conversation root.
    pub conversation_id: QualifiedHash,
    pub parent: QualifiedHash,
    pub author: QualifiedHash,
    /// Distance from the community (conversation roots have depth 1).
    pub depth: u32,
    pub content: String,
    pub metadata: Vec<u8>,
    pub created: Timestamp,
}

/// A node attached to a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    id: QualifiedHash,
    created: Timestamp,
    community_id: QualifiedHash,
    conversation_id: QualifiedHash,
    parent: QualifiedHash,
    author: QualifiedHash,
    depth: u32,
    content: String,
    metadata: Vec<u8>,
}

impl Reply {
    pub fn from_parts(parts: ReplyParts) -> Self {
        let mut reply = Self {
            id: QualifiedHash::null(),
            created: parts.created,
            community_id: parts.community_id,
            conversation_id: parts.conversation_id,
            parent: parts.parent,
            author: parts.author,
            depth: parts.depth,
            content: parts.content,
            metadata: parts.metadata,
        };
        reply.id = reply.content_hash();
        reply
    }

    /// Start a new conversation directly under a community.
    pub fn conversation(
        community: &Community,
        author: QualifiedHash,
        content: impl Into<String>,
        created: Timestamp,
    ) -> Self {
        Self::from_parts(ReplyParts {
            community_id: community.id(),
            conversation_id: QualifiedHash::null(),
            parent: community.id(),
            author,
            depth: 1,
            content: content.into(),
            metadata: Vec::new(),
            created,
        })
    }

    /// Respond to an existing reply, inheriting its community and conversation.
    pub fn respond(
        to: &Reply,
        author: QualifiedHash,
        content: impl Into<String>,
        created: Timestamp,
    ) -> Self {
        let conversation_id = if to.conversation_id.is_null() {
            to.id
        } else {
            to.conversation_id
        };
        Self::from_parts(ReplyParts {
            community_id: to.community_id,
            conversation_id,
            parent: to.id,
            author,
            depth: to.depth + 1,
            content: content.into(),
            metadata: Vec::new(),
            created,
        })
    }

    fn content_hash(&self) -> QualifiedHash {
        ContentHasher::new(NodeKind::Reply)
            .timestamp(self.created)
            .hash(&self.community_id)
            .hash(&self.conversation_id)
            .hash(&self.parent)
            .hash(&self.author)
            .bytes(&self.depth.to_be_bytes())
            .bytes(self.content.as_bytes())
            .bytes(&self.metadata)
            .finish()
    }

    pub fn community_id(&self) -> QualifiedHash {
        self.community_id
    }

    pub fn conversation_id(&self) -> QualifiedHash {
        self.conversation_id
    }

    pub fn author(&self) -> QualifiedHash {
        self.author
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }
}

impl ForestNode for Reply {
    fn id(&self) -> QualifiedHash {
        self.id
    }

    fn parent_id(&self) -> QualifiedHash {
        self.parent
    }

    fn created_at(&self) -> Timestamp {
        self.created
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Reply
    }
}

// =============================================================================
// NODE
// =============================================================================

/// Any forest node, discriminated by kind.
///
/// Variant order matches the [`NodeKind`] tags; binary codecs rely on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    Identity(Identity),
    Community(Community),
    Reply(Reply),
}

impl Node {
    pub fn as_identity(&self) -> Option<&Identity> {
        match self {
            Node::Identity(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn as_community(&self) -> Option<&Community> {
        match self {
            Node::Community(community) => Some(community),
            _ => None,
        }
    }

    pub fn as_reply(&self) -> Option<&Reply> {
        match self {
            Node::Reply(reply) => Some(reply),
            _ => None,
        }
    }

    /// Whether the stored id matches the node's content hash.
    pub fn verify_id(&self) -> bool {
        let expected = match self {
            Node::Identity(n) => n.content_hash(),
            Node::Community(n) => n.content_hash(),
            Node::Reply(n) => n.content_hash(),
        };
        expected == self.id()
    }
}

impl ForestNode for Node {
    fn id(&self) -> QualifiedHash {
        match self {
            Node::Identity(n) => n.id(),
            Node::Community(n) => n.id(),
            Node::Reply(n) => n.id(),
        }
    }

    fn parent_id(&self) -> QualifiedHash {
        match self {
            Node::Identity(n) => n.parent_id(),
            Node::Community(n) => n.parent_id(),
            Node::Reply(n) => n.parent_id(),
        }
    }

    fn created_at(&self) -> Timestamp {
        match self {
            Node::Identity(n) => n.created_at(),
            Node::Community(n) => n.created_at(),
            Node::Reply(n) => n.created_at(),
        }
    }

    fn kind(&self) -> NodeKind {
        match self {
            Node::Identity(_) => NodeKind::Identity,
            Node::Community(_) => NodeKind::Community,
            Node::Reply(_) => NodeKind::Reply,
        }
    }
}

impl From<Identity> for Node {
    fn from(identity: Identity) -> Self {
        Node::Identity(identity)
    }
}

impl From<Community> for Node {
    fn from(community: Community) -> Self {
        Node::Community(community)
    }
}

impl From<Reply> for Node {
    fn from(reply: Reply) -> Self {
        Node::Reply(reply)
    }
}

impl TryFrom<Node> for Identity {
    type Error = Node;

    fn try_from(node: Node) -> Result<Self, Self::Error> {
        match node {
            Node::Identity(identity) => Ok(identity),
            other => Err(other),
        }
    }
}

impl TryFrom<Node> for Community {
    type Error = Node;

    fn try_from(node: Node) -> Result<Self, Self::Error> {
        match node {
            Node::Community(community) => Ok(community),
            other => Err(other),
        }
    }
}

impl TryFrom<Node> for Reply {
    type Error = Node;

    fn try_from(node: Node) -> Result<Self, Self::Error> {
        match node {
            Node::Reply(reply) => Ok(reply),
            other => Err(other),
        }
    }
}
