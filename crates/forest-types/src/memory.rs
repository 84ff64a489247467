//! # In-Memory Store
//!
//! Unbounded, process-local [`Store`]. Useful as a scratch store, as a
//! `copy_into` target and as a reference model in tests.

use crate::entities::{ForestNode, Node, NodeKind, QualifiedHash, Timestamp};
use crate::errors::StoreError;
use crate::store::{Copiable, Paginated, Store};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
struct Inner {
    /// Node plus its insertion sequence.
    nodes: HashMap<QualifiedHash, (Node, u64)>,
    children: HashMap<QualifiedHash, Vec<QualifiedHash>>,
    next_seq: u64,
}

impl Inner {
    /// Nodes of `kind` ordered youngest first, ties in insertion order.
    fn by_age(&self, kind: NodeKind) -> Vec<&Node> {
        let mut matching: Vec<_> = self
            .nodes
            .values()
            .filter(|(node, _)| node.kind() == kind)
            .collect();
        matching.sort_by(|(a, a_seq), (b, b_seq)| {
            b.created_at()
                .cmp(&a.created_at())
                .then(a_seq.cmp(b_seq))
        });
        matching.into_iter().map(|(node, _)| node).collect()
    }
}

/// A [`Store`] held entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored nodes.
    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Store for MemoryStore {
    fn add(&self, node: &Node) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let id = node.id();
        if inner.nodes.contains_key(&id) {
            return Ok(());
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.nodes.insert(id, (node.clone(), seq));
        inner.children.entry(node.parent_id()).or_default().push(id);
        Ok(())
    }

    fn get(&self, id: &QualifiedHash) -> Result<Option<Node>, StoreError> {
        Ok(self.inner.read().nodes.get(id).map(|(node, _)| node.clone()))
    }

    fn children(&self, parent: &QualifiedHash) -> Result<Vec<QualifiedHash>, StoreError> {
        Ok(self
            .inner
            .read()
            .children
            .get(parent)
            .cloned()
            .unwrap_or_default())
    }

    fn recent(&self, kind: NodeKind, quantity: usize) -> Result<Vec<Node>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .by_age(kind)
            .into_iter()
            .take(quantity)
            .cloned()
            .collect())
    }

    fn remove_subtree(&self, id: &QualifiedHash) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let mut pending = vec![*id];
        let mut removed = 0usize;
        while let Some(current) = pending.pop() {
            let Some((node, _)) = inner.nodes.remove(&current) else {
                continue;
            };
            if let Some(children) = inner.children.remove(&current) {
                pending.extend(children);
            }
            if let Some(siblings) = inner.children.get_mut(&node.parent_id()) {
                siblings.retain(|sibling| *sibling != current);
                if siblings.is_empty() {
                    inner.children.remove(&node.parent_id());
                }
            }
            removed += 1;
        }
        tracing::debug!(root = %id, removed, "[memory] removed subtree");
        Ok(())
    }
}

impl Paginated for MemoryStore {
    fn children_batched(
        &self,
        parent: &QualifiedHash,
        quantity: usize,
        offset: usize,
    ) -> Result<(Vec<QualifiedHash>, usize), StoreError> {
        let batch: Vec<_> = self
            .inner
            .read()
            .children
            .get(parent)
            .map(|children| children.iter().skip(offset).take(quantity).copied().collect())
            .unwrap_or_default();
        let total = batch.len();
        Ok((batch, total))
    }

    fn recent_from(
        &self,
        kind: NodeKind,
        ts: Timestamp,
        quantity: usize,
    ) -> Result<Vec<Node>, StoreError> {
        if ts.as_millis() == 0 {
            return Ok(Vec::new());
        }
        let inner = self.inner.read();
        Ok(inner
            .by_age(kind)
            .into_iter()
            .filter(|node| node.created_at() < ts)
            .take(quantity)
            .cloned()
            .collect())
    }
}

impl Copiable for MemoryStore {
    fn copy_into(&self, other: &dyn Store) -> Result<(), StoreError> {
        let nodes: Vec<Node> = {
            let inner = self.inner.read();
            let mut ordered: Vec<_> = inner.nodes.values().collect();
            ordered.sort_by_key(|(_, seq)| *seq);
            ordered.into_iter().map(|(node, _)| node.clone()).collect()
        };
        for node in &nodes {
            other.add(node).map_err(|err| StoreError::Copy {
                id: node.id(),
                reason: err.to_string(),
            })?;
        }
        Ok(())
    }
}
