//! # Index Cursors
//!
//! Iteration over an index bucket joined against a primary bucket.
//!
//! ## Ordering
//!
//! The outer cursor walks index keys in byte order (or reverse byte order).
//! A key holding a collision group is drained completely before the outer
//! cursor moves on. Within a group, entries always come out in insertion
//! order, also in reverse mode: equal keys tie-break by insertion.
//!
//! ```text
//! index:  t1 -> a     t2 -> {1: b, 2: c}     t3 -> d
//! forward: a b c d
//! reverse: d b c a
//! ```

use crate::adapters::storage::{BucketRef, Cursor, CursorItem};
use crate::domain::errors::{CodecError, Context, OrchardError};
use crate::ports::outbound::NodeCodec;
use forest_types::{Community, ForestNode, Identity, Node, NodeKind, Reply};
use std::marker::PhantomData;

/// Order in which the outer index keys are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

/// One resolved index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry<'a> {
    /// Outer index key.
    pub key: &'a [u8],
    /// Index value: the id of the node.
    pub id: &'a [u8],
    /// Primary record for `id`, if one exists.
    pub record: Option<&'a [u8]>,
}

/// Byte-level cursor over an index joined against a primary bucket.
pub struct IndexCursor<'a> {
    primary: BucketRef<'a>,
    index: Option<BucketRef<'a>>,
    direction: Direction,
    outer: Option<Cursor<'a>>,
    group: Option<(&'a [u8], Cursor<'a>)>,
}

impl<'a> IndexCursor<'a> {
    /// A missing `index` bucket behaves like an empty one.
    pub fn new(primary: BucketRef<'a>, index: Option<BucketRef<'a>>, direction: Direction) -> Self {
        Self {
            primary,
            index,
            direction,
            outer: None,
            group: None,
        }
    }

    /// Position at the first entry in iteration order.
    pub fn first(&mut self) -> Option<IndexEntry<'a>> {
        self.group = None;
        let mut outer = self.index?.cursor();
        let item = match self.direction {
            Direction::Forward => outer.first(),
            Direction::Reverse => outer.last(),
        };
        self.outer = Some(outer);
        self.settle(item)
    }

    /// Advance to the next entry. An unpositioned cursor starts at `first`.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<IndexEntry<'a>> {
        if self.outer.is_none() {
            return self.first();
        }
        let in_group = match self.group.as_mut() {
            Some((key, cursor)) => next_value(cursor, false).map(|id| (*key, id)),
            None => None,
        };
        if let Some((key, id)) = in_group {
            return Some(self.entry(key, id));
        }
        self.group = None;
        let item = self.advance_outer();
        self.settle(item)
    }

    fn advance_outer(&mut self) -> Option<CursorItem<'a>> {
        let outer = self.outer.as_mut()?;
        match self.direction {
            Direction::Forward => outer.next(),
            Direction::Reverse => outer.prev(),
        }
    }

    /// Resolve `item` to an entry, descending into collision groups and
    /// skipping empty ones.
    fn settle(&mut self, mut item: Option<CursorItem<'a>>) -> Option<IndexEntry<'a>> {
        loop {
            let (key, value) = item?;
            if let Some(id) = value {
                return Some(self.entry(key, id));
            }
            let group = self.index.and_then(|index| index.bucket(key));
            if let Some(group) = group {
                let mut cursor = group.cursor();
                if let Some(id) = next_value(&mut cursor, true) {
                    self.group = Some((key, cursor));
                    return Some(self.entry(key, id));
                }
            }
            item = self.advance_outer();
        }
    }

    fn entry(&self, key: &'a [u8], id: &'a [u8]) -> IndexEntry<'a> {
        IndexEntry {
            key,
            id,
            record: self.primary.get(id),
        }
    }
}

/// Next plain value in a collision group, in insertion order.
fn next_value<'a>(cursor: &mut Cursor<'a>, from_start: bool) -> Option<&'a [u8]> {
    let mut item = if from_start {
        cursor.first()
    } else {
        cursor.next()
    };
    loop {
        match item? {
            (_, Some(value)) => return Some(value),
            (_, None) => item = cursor.next(),
        }
    }
}

// =============================================================================
// TYPED CURSORS
// =============================================================================

/// A concrete node type that typed cursors can decode into.
pub trait TypedNode: TryFrom<Node, Error = Node> + ForestNode {
    const KIND: NodeKind;
}

impl TypedNode for Identity {
    const KIND: NodeKind = NodeKind::Identity;
}

impl TypedNode for Community {
    const KIND: NodeKind = NodeKind::Community;
}

impl TypedNode for Reply {
    const KIND: NodeKind = NodeKind::Reply;
}

/// Decoding wrapper over an [`IndexCursor`].
///
/// Iteration yields `Err` for entries that fail to decode and ends with
/// `None` once the index is exhausted.
pub struct TypedCursor<'a, 'c, C, T> {
    inner: IndexCursor<'a>,
    codec: &'c C,
    started: bool,
    _node: PhantomData<fn() -> T>,
}

pub type ReplyCursor<'a, 'c, C> = TypedCursor<'a, 'c, C, Reply>;
pub type IdentityCursor<'a, 'c, C> = TypedCursor<'a, 'c, C, Identity>;
pub type CommunityCursor<'a, 'c, C> = TypedCursor<'a, 'c, C, Community>;

impl<'a, 'c, C: NodeCodec, T: TypedNode> TypedCursor<'a, 'c, C, T> {
    pub fn new(inner: IndexCursor<'a>, codec: &'c C) -> Self {
        Self {
            inner,
            codec,
            started: false,
            _node: PhantomData,
        }
    }

    /// Restart from the first entry.
    pub fn first(&mut self) -> Option<Result<T, OrchardError>> {
        self.started = true;
        let entry = self.inner.first();
        entry.map(|entry| self.decode(entry))
    }

    fn decode(&self, entry: IndexEntry<'_>) -> Result<T, OrchardError> {
        let Some(record) = entry.record else {
            return Err(OrchardError::DanglingEntry {
                id: hex::encode(entry.id),
            });
        };
        let node = self
            .codec
            .decode(record)
            .context("decoding indexed record")?;
        T::try_from(node).map_err(|other| OrchardError::Serialization {
            context: "decoding indexed record",
            source: CodecError::KindMismatch {
                expected: T::KIND,
                found: other.kind(),
            },
        })
    }
}

impl<'a, 'c, C: NodeCodec, T: TypedNode> Iterator for TypedCursor<'a, 'c, C, T> {
    type Item = Result<T, OrchardError>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            return self.first();
        }
        let entry = self.inner.next();
        entry.map(|entry| self.decode(entry))
    }
}
