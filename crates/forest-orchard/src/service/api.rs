//! # Store Contract Implementation
//!
//! Implements `Store`, `Paginated` and `Copiable` on top of the inherent
//! orchard operations, converting errors into `StoreError`.

use super::Orchard;
use crate::ports::inbound::{Copiable, Paginated, Store};
use crate::ports::outbound::NodeCodec;
use forest_types::{Node, NodeKind, QualifiedHash, StoreError, Timestamp};

impl<C: NodeCodec> Store for Orchard<C> {
    fn add(&self, node: &Node) -> Result<(), StoreError> {
        Ok(Orchard::add(self, node)?)
    }

    fn get(&self, id: &QualifiedHash) -> Result<Option<Node>, StoreError> {
        Ok(Orchard::get(self, id)?)
    }

    fn children(&self, parent: &QualifiedHash) -> Result<Vec<QualifiedHash>, StoreError> {
        Ok(Orchard::children(self, parent)?)
    }

    fn recent(&self, kind: NodeKind, quantity: usize) -> Result<Vec<Node>, StoreError> {
        Ok(Orchard::recent(self, kind, quantity)?)
    }

    fn remove_subtree(&self, id: &QualifiedHash) -> Result<(), StoreError> {
        Ok(Orchard::remove_subtree(self, id)?)
    }
}

impl<C: NodeCodec> Paginated for Orchard<C> {
    fn children_batched(
        &self,
        parent: &QualifiedHash,
        quantity: usize,
        offset: usize,
    ) -> Result<(Vec<QualifiedHash>, usize), StoreError> {
        Ok(Orchard::children_batched(self, parent, quantity, offset)?)
    }

    fn recent_from(
        &self,
        kind: NodeKind,
        ts: Timestamp,
        quantity: usize,
    ) -> Result<Vec<Node>, StoreError> {
        Ok(Orchard::recent_from(self, kind, ts, quantity)?)
    }
}

impl<C: NodeCodec> Copiable for Orchard<C> {
    fn copy_into(&self, other: &dyn Store) -> Result<(), StoreError> {
        Ok(Orchard::copy_into(self, other)?)
    }
}

