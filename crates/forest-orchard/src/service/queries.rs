//! # Read Path
//!
//! Lookups, children listings and recency windows.
//!
//! Raw records are copied out of the read transaction and decoded after it
//! is released, except in the typed recency queries where decoding drives
//! the filtering.

use super::Orchard;
use crate::domain::cursor::{Direction, IndexCursor, TypedCursor, TypedNode};
use crate::domain::errors::{CodecError, Context, OrchardError};
use crate::domain::index::IndexView;
use crate::domain::keys::{decode_id, decode_kind, encode_id};
use crate::ports::inbound::RecencyQueries;
use crate::ports::outbound::NodeCodec;
use forest_types::{
    Community, ForestNode, Identity, Node, NodeKind, QualifiedHash, Reply, Timestamp,
};

impl<C: NodeCodec> Orchard<C> {
    /// Retrieve a node by id. An absent id is `Ok(None)`, not an error.
    ///
    /// # Errors
    ///
    /// - `UnknownKind`: the type index holds an invalid kind byte
    /// - `DanglingEntry`: the type index names a node with no primary record
    /// - `Serialization`: the primary record does not decode, or decodes to a
    ///   node with a different id
    pub fn get(&self, id: &QualifiedHash) -> Result<Option<Node>, OrchardError> {
        if let Some(node) = self.cache.get(id) {
            return Ok(Some(node));
        }

        let generation = self.cache.generation();
        let id_bytes = encode_id(id);
        let buckets = &self.config.buckets;
        let record = self.db.view(|tx| {
            let types = tx.bucket(&buckets.node_type).context("reading type index")?;
            let Some(tag) = types.get(&id_bytes) else {
                return Ok(None);
            };
            let kind = decode_kind(tag)?;
            let primary = tx
                .bucket(buckets.primary(kind))
                .context("reading primary bucket")?;
            match primary.get(&id_bytes) {
                Some(record) => Ok(Some(record.to_vec())),
                None => {
                    #[cfg(feature = "tracing-log")]
                    tracing::warn!(id = %id, "[orchard] ⚠️ Type entry without primary record");
                    Err(OrchardError::DanglingEntry {
                        id: hex::encode(&id_bytes),
                    })
                }
            }
        })?;

        let Some(record) = record else {
            return Ok(None);
        };
        let node = self.codec.decode(&record).context("decoding node")?;
        if node.id() != *id {
            return Err(OrchardError::Serialization {
                context: "decoding node",
                source: CodecError::IdMismatch { stored: node.id() },
            });
        }
        if self.cache.insert_if_current(*id, node.clone(), generation) {
            #[cfg(feature = "tracing-log")]
            tracing::trace!(id = %id, "[orchard] cached node");
        }
        Ok(Some(node))
    }

    /// Ids of the direct children of `parent`, in insertion order.
    pub fn children(&self, parent: &QualifiedHash) -> Result<Vec<QualifiedHash>, OrchardError> {
        self.children_window(parent, usize::MAX, 0)
    }

    /// Skip `offset` children of `parent`, then return up to `quantity`
    /// more together with the number returned.
    ///
    /// The count is the size of this page, not the total number of children.
    pub fn children_batched(
        &self,
        parent: &QualifiedHash,
        quantity: usize,
        offset: usize,
    ) -> Result<(Vec<QualifiedHash>, usize), OrchardError> {
        let ids = self.children_window(parent, quantity, offset)?;
        let count = ids.len();
        Ok((ids, count))
    }

    fn children_window(
        &self,
        parent: &QualifiedHash,
        quantity: usize,
        offset: usize,
    ) -> Result<Vec<QualifiedHash>, OrchardError> {
        let key = encode_id(parent);
        self.db.view(|tx| {
            let index = IndexView::new(
                tx.bucket(&self.config.buckets.children)
                    .context("reading children index")?,
            );
            index
                .window(&key, offset, quantity)
                .into_iter()
                .map(|bytes| decode_id(bytes).context("decoding child id"))
                .collect()
        })
    }

    /// Up to `quantity` nodes of `kind`, youngest first.
    ///
    /// Nodes sharing a timestamp come out in insertion order.
    ///
    /// # Errors
    ///
    /// `PartialDecode` when some records fail to decode. The error carries
    /// the nodes that did decode, in order, and one error per failed record.
    pub fn recent(&self, kind: NodeKind, quantity: usize) -> Result<Vec<Node>, OrchardError> {
        let buckets = &self.config.buckets;
        let raw = self.db.view(|tx| {
            let primary = tx
                .bucket(buckets.primary(kind))
                .context("reading primary bucket")?;
            let index = tx
                .bucket(&buckets.age)
                .context("reading age index")?
                .bucket(buckets.primary(kind));
            let mut cursor = IndexCursor::new(primary, index, Direction::Reverse);

            let mut raw = Vec::new();
            while raw.len() < quantity {
                let Some(entry) = cursor.next() else {
                    break;
                };
                raw.push(match entry.record {
                    Some(record) => Ok(record.to_vec()),
                    None => Err(OrchardError::DanglingEntry {
                        id: hex::encode(entry.id),
                    }),
                });
            }
            Ok::<_, OrchardError>(raw)
        })?;

        let mut nodes = Vec::with_capacity(raw.len());
        let mut errors = Vec::new();
        for item in raw {
            match item.and_then(|record| self.decode_as(kind, &record)) {
                Ok(node) => nodes.push(node),
                Err(err) => errors.push(err),
            }
        }

        if errors.is_empty() {
            return Ok(nodes);
        }

        #[cfg(feature = "tracing-log")]
        tracing::warn!(
            kind = %kind,
            count = errors.len(),
            "[orchard] ⚠️ Recent scan hit undecodable records"
        );

        Err(OrchardError::PartialDecode { nodes, errors })
    }

    /// Up to `quantity` nodes of `kind` created strictly before `ts`,
    /// youngest first.
    pub fn recent_from(
        &self,
        kind: NodeKind,
        ts: Timestamp,
        quantity: usize,
    ) -> Result<Vec<Node>, OrchardError> {
        Ok(match kind {
            NodeKind::Identity => into_nodes(self.recent_identities(ts, quantity)?),
            NodeKind::Community => into_nodes(self.recent_communities(ts, quantity)?),
            NodeKind::Reply => into_nodes(self.recent_replies(ts, quantity)?),
        })
    }

    fn decode_as(&self, kind: NodeKind, record: &[u8]) -> Result<Node, OrchardError> {
        let node = self.codec.decode(record).context("decoding recent record")?;
        if node.kind() != kind {
            return Err(OrchardError::Serialization {
                context: "decoding recent record",
                source: CodecError::KindMismatch {
                    expected: kind,
                    found: node.kind(),
                },
            });
        }
        Ok(node)
    }

    /// Walk the age index of `T` in `direction`, keeping nodes strictly
    /// older (reverse) or strictly younger (forward) than `ts`.
    fn age_window<T: TypedNode>(
        &self,
        ts: Timestamp,
        quantity: usize,
        direction: Direction,
    ) -> Result<Vec<T>, OrchardError> {
        if ts.0 == 0 || quantity == 0 {
            return Ok(Vec::new());
        }

        let buckets = &self.config.buckets;
        self.db.view(|tx| {
            let primary = tx
                .bucket(buckets.primary(T::KIND))
                .context("reading primary bucket")?;
            let index = tx
                .bucket(&buckets.age)
                .context("reading age index")?
                .bucket(buckets.primary(T::KIND));
            let cursor: TypedCursor<'_, '_, C, T> =
                TypedCursor::new(IndexCursor::new(primary, index, direction), &self.codec);

            let mut found = Vec::new();
            for node in cursor {
                let node = node?;
                let in_window = match direction {
                    Direction::Reverse => node.created_at() < ts,
                    Direction::Forward => node.created_at() > ts,
                };
                if in_window {
                    found.push(node);
                    if found.len() == quantity {
                        break;
                    }
                }
            }
            Ok(found)
        })
    }
}

fn into_nodes<T: Into<Node>>(items: Vec<T>) -> Vec<Node> {
    items.into_iter().map(Into::into).collect()
}

impl<C: NodeCodec> RecencyQueries for Orchard<C> {
    type Error = OrchardError;

    fn recent_replies(&self, ts: Timestamp, quantity: usize) -> Result<Vec<Reply>, OrchardError> {
        self.age_window(ts, quantity, Direction::Reverse)
    }

    fn replies_after(&self, ts: Timestamp, quantity: usize) -> Result<Vec<Reply>, OrchardError> {
        self.age_window(ts, quantity, Direction::Forward)
    }

    fn recent_identities(
        &self,
        ts: Timestamp,
        quantity: usize,
    ) -> Result<Vec<Identity>, OrchardError> {
        self.age_window(ts, quantity, Direction::Reverse)
    }

    fn recent_communities(
        &self,
        ts: Timestamp,
        quantity: usize,
    ) -> Result<Vec<Community>, OrchardError> {
        self.age_window(ts, quantity, Direction::Reverse)
    }
}
