//! # Store Contract
//!
//! The capability surface every forest store offers to message-ingestion
//! layers and to other stores.
//!
//! - [`Store`]: insertion, lookup, children, recency, subtree removal.
//! - [`Paginated`]: paging through children and recency windows.
//! - [`Copiable`]: exporting every node into another store.

use crate::entities::{Community, Identity, Node, NodeKind, QualifiedHash, Reply, Timestamp};
use crate::errors::StoreError;

/// A collection of forest nodes.
///
/// Implementations are shared across threads, so every method takes `&self`.
pub trait Store: Send + Sync {
    /// Insert a node. Inserting a node that is already stored is not an error.
    fn add(&self, node: &Node) -> Result<(), StoreError>;

    /// Retrieve a node by id. An absent id yields `Ok(None)`.
    fn get(&self, id: &QualifiedHash) -> Result<Option<Node>, StoreError>;

    /// Retrieve an identity by id. Nodes of another kind yield `Ok(None)`.
    fn get_identity(&self, id: &QualifiedHash) -> Result<Option<Identity>, StoreError> {
        Ok(self.get(id)?.and_then(|node| Identity::try_from(node).ok()))
    }

    /// Retrieve a community by id. Nodes of another kind yield `Ok(None)`.
    fn get_community(&self, id: &QualifiedHash) -> Result<Option<Community>, StoreError> {
        Ok(self.get(id)?.and_then(|node| Community::try_from(node).ok()))
    }

    /// Retrieve the root reply of a conversation.
    ///
    /// Lookup is by id alone; the community id is accepted for callers that
    /// address replies hierarchically.
    fn get_conversation(
        &self,
        _community: &QualifiedHash,
        conversation: &QualifiedHash,
    ) -> Result<Option<Reply>, StoreError> {
        Ok(self
            .get(conversation)?
            .and_then(|node| Reply::try_from(node).ok()))
    }

    /// Retrieve a reply. Lookup is by reply id alone.
    fn get_reply(
        &self,
        _community: &QualifiedHash,
        _conversation: &QualifiedHash,
        reply: &QualifiedHash,
    ) -> Result<Option<Reply>, StoreError> {
        Ok(self.get(reply)?.and_then(|node| Reply::try_from(node).ok()))
    }

    /// Ids of the direct children of `parent`, in insertion order.
    fn children(&self, parent: &QualifiedHash) -> Result<Vec<QualifiedHash>, StoreError>;

    /// Up to `quantity` nodes of `kind`, youngest first.
    ///
    /// When some records cannot be decoded the result is
    /// [`StoreError::PartialDecode`], which still carries the decoded nodes.
    fn recent(&self, kind: NodeKind, quantity: usize) -> Result<Vec<Node>, StoreError>;

    /// Remove a node and all of its descendants. Removing an absent id succeeds.
    fn remove_subtree(&self, id: &QualifiedHash) -> Result<(), StoreError>;
}

/// Stores that can page through their contents.
pub trait Paginated {
    /// Skip `offset` children of `parent` and return up to `quantity` more,
    /// together with the number returned.
    ///
    /// Callers page by increasing `offset` until a short page comes back.
    fn children_batched(
        &self,
        parent: &QualifiedHash,
        quantity: usize,
        offset: usize,
    ) -> Result<(Vec<QualifiedHash>, usize), StoreError>;

    /// Up to `quantity` nodes of `kind` created strictly before `ts`,
    /// youngest first. A zero timestamp yields nothing.
    fn recent_from(
        &self,
        kind: NodeKind,
        ts: Timestamp,
        quantity: usize,
    ) -> Result<Vec<Node>, StoreError>;
}

/// Stores that can export themselves into another store.
pub trait Copiable {
    /// Add every node of this store to `other`.
    fn copy_into(&self, other: &dyn Store) -> Result<(), StoreError>;
}
