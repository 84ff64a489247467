//! # Write Path
//!
//! Insertion and subtree removal. Every node is written or removed in a
//! single update transaction covering its primary record and all three
//! indexes.

use super::Orchard;
use crate::domain::errors::{Context, OrchardError};
use crate::domain::index::{Index, IndexView};
use crate::domain::keys::{encode_id, encode_kind, encode_timestamp};
use crate::ports::outbound::NodeCodec;
use forest_types::{ForestNode, Node, QualifiedHash};

impl<C: NodeCodec> Orchard<C> {
    /// Insert `node`. Inserting a node that is already stored is a no-op.
    ///
    /// ## Atomicity
    ///
    /// The primary record, the type index entry, the age index entry and the
    /// children index entry are committed together or not at all.
    pub fn add(&self, node: &Node) -> Result<(), OrchardError> {
        let id = node.id();
        if self.get(&id)?.is_some() {
            return Ok(());
        }

        let kind = node.kind();
        let record = self.codec.encode(node).context("encoding node")?;
        let id_bytes = encode_id(&id);
        let parent_bytes = encode_id(&node.parent_id());
        let created = encode_timestamp(node.created_at());
        let buckets = &self.config.buckets;

        let inserted = self.db.update(|tx| {
            {
                let mut primary = tx
                    .bucket(buckets.primary(kind))
                    .context("opening primary bucket")?;
                // Lost a race with a concurrent insert of the same node.
                if primary.get(&id_bytes).is_some() {
                    return Ok(false);
                }
                primary
                    .put(&id_bytes, &record)
                    .context("writing primary record")?;
            }

            tx.bucket(&buckets.node_type)
                .context("opening type index")?
                .put(&id_bytes, &encode_kind(kind))
                .context("writing type index")?;

            {
                let mut age = tx.bucket(&buckets.age).context("opening age index")?;
                let by_kind = age
                    .create_bucket_if_not_exists(buckets.primary(kind))
                    .context("opening age index")?;
                Index::new(by_kind).put(&created, &id_bytes)?;
            }

            let children = tx
                .bucket(&buckets.children)
                .context("opening children index")?;
            Index::new(children).put(&parent_bytes, &id_bytes)?;
            Ok::<_, OrchardError>(true)
        })?;

        if inserted {
            #[cfg(feature = "tracing-log")]
            tracing::debug!(id = %id, kind = %kind, "[orchard] ➕ Added node");
        }

        Ok(())
    }

    /// Remove the node `id` and all of its descendants.
    ///
    /// Removing an absent id succeeds. Each node is deleted in its own
    /// transaction, children before parents, so an interrupted removal can be
    /// resumed by calling this again with the same root. A child added under
    /// a node while its subtree is being removed is removed as well.
    pub fn remove_subtree(&self, id: &QualifiedHash) -> Result<(), OrchardError> {
        let Some(root) = self.get(id)? else {
            return Ok(());
        };

        // `(node, expanded)`: a node is deleted once its children have been
        // pushed above it and removed.
        let mut stack = vec![(root, false)];
        let mut removed = 0usize;
        while let Some((node, expanded)) = stack.pop() {
            if !expanded {
                let children = self.children(&node.id())?;
                stack.push((node, true));
                for child in children.iter().rev() {
                    if let Some(child) = self.get(child)? {
                        stack.push((child, false));
                    }
                }
                continue;
            }

            if self.delete_node(&node)? {
                removed += 1;
            } else {
                #[cfg(feature = "tracing-log")]
                tracing::debug!(
                    id = %node.id(),
                    "[orchard] Child attached during removal, rediscovering"
                );
                stack.push((node, false));
            }
        }

        #[cfg(feature = "tracing-log")]
        tracing::debug!(root = %id, count = removed, "[orchard] 🪓 Removed subtree");
        #[cfg(not(feature = "tracing-log"))]
        let _ = removed;

        Ok(())
    }

    /// Delete one node from its primary bucket and every index.
    ///
    /// Returns `false` and changes nothing if a stored node is still linked
    /// as a child of `node`. Children links to ids that are no longer stored
    /// are dropped with the node.
    ///
    /// Evicts before the transaction so readers stop hitting the cache, and
    /// after it so a lookup that raced the delete cannot re-populate it.
    pub(super) fn delete_node(&self, node: &Node) -> Result<bool, OrchardError> {
        let id = node.id();
        let kind = node.kind();
        let id_bytes = encode_id(&id);
        let parent_bytes = encode_id(&node.parent_id());
        let created = encode_timestamp(node.created_at());
        let buckets = &self.config.buckets;

        self.cache.evict(&id);
        let deleted = self.db.update(|tx| {
            {
                let types = tx.view(&buckets.node_type).context("reading type index")?;
                if types.get(&id_bytes).is_none() {
                    // Already removed by someone else.
                    return Ok(true);
                }
                let children = IndexView::new(
                    tx.view(&buckets.children)
                        .context("reading children index")?,
                );
                if children
                    .values(&id_bytes)
                    .into_iter()
                    .any(|child| types.get(child).is_some())
                {
                    return Ok(false);
                }
            }

            tx.bucket(buckets.primary(kind))
                .context("opening primary bucket")?
                .delete(&id_bytes)
                .context("removing primary record")?;

            {
                let mut age = tx.bucket(&buckets.age).context("opening age index")?;
                if let Some(by_kind) = age.bucket(buckets.primary(kind)) {
                    Index::new(by_kind).delete_by_value(&created, &id_bytes)?;
                }
            }

            tx.bucket(&buckets.node_type)
                .context("opening type index")?
                .delete(&id_bytes)
                .context("removing type index entry")?;

            let mut children = Index::new(
                tx.bucket(&buckets.children)
                    .context("opening children index")?,
            );
            children.delete(&id_bytes)?;
            children.delete_by_value(&parent_bytes, &id_bytes)?;
            Ok::<_, OrchardError>(true)
        })?;
        self.cache.evict(&id);

        if deleted {
            #[cfg(feature = "tracing-log")]
            tracing::debug!(id = %id, kind = %kind, "[orchard] Deleted node");
        }

        Ok(deleted)
    }
}
