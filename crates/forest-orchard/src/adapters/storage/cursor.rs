//! # Bucket Cursor
//!
//! Bidirectional cursor over one bucket in byte order of its keys.

use super::bucket::{Bucket, Entry};
use std::ops::Bound;

/// A `(key, value)` pair. Nested buckets report `None` as their value.
pub type CursorItem<'a> = (&'a [u8], Option<&'a [u8]>);

#[derive(Clone, Copy)]
enum Position<'a> {
    Unpositioned,
    At(&'a [u8]),
    Exhausted,
}

/// Cursor over the keys of one bucket.
///
/// `next` on an unpositioned cursor behaves like `first`, `prev` like `last`.
/// Once the cursor runs off either end it stays exhausted until repositioned
/// with `first`, `last` or `seek`.
pub struct Cursor<'a> {
    bucket: &'a Bucket,
    position: Position<'a>,
}

#[allow(clippy::should_implement_trait)]
impl<'a> Cursor<'a> {
    pub(crate) fn new(bucket: &'a Bucket) -> Self {
        Self {
            bucket,
            position: Position::Unpositioned,
        }
    }

    fn land(&mut self, found: Option<(&'a Vec<u8>, &'a Entry)>) -> Option<CursorItem<'a>> {
        match found {
            Some((key, entry)) => {
                self.position = Position::At(key.as_slice());
                let value = match entry {
                    Entry::Value(value) => Some(value.as_slice()),
                    Entry::Bucket(_) => None,
                };
                Some((key.as_slice(), value))
            }
            None => {
                self.position = Position::Exhausted;
                None
            }
        }
    }

    pub fn first(&mut self) -> Option<CursorItem<'a>> {
        let found = self.bucket.entries.iter().next();
        self.land(found)
    }

    pub fn last(&mut self) -> Option<CursorItem<'a>> {
        let found = self.bucket.entries.iter().next_back();
        self.land(found)
    }

    /// Position at the first key greater than or equal to `key`.
    pub fn seek(&mut self, key: &[u8]) -> Option<CursorItem<'a>> {
        let found = self
            .bucket
            .entries
            .range::<[u8], _>((Bound::Included(key), Bound::Unbounded))
            .next();
        self.land(found)
    }

    pub fn next(&mut self) -> Option<CursorItem<'a>> {
        match self.position {
            Position::Unpositioned => self.first(),
            Position::Exhausted => None,
            Position::At(current) => {
                let found = self
                    .bucket
                    .entries
                    .range::<[u8], _>((Bound::Excluded(current), Bound::Unbounded))
                    .next();
                self.land(found)
            }
        }
    }

    pub fn prev(&mut self) -> Option<CursorItem<'a>> {
        match self.position {
            Position::Unpositioned => self.last(),
            Position::Exhausted => None,
            Position::At(current) => {
                let found = self
                    .bucket
                    .entries
                    .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(current)))
                    .next_back();
                self.land(found)
            }
        }
    }
}
