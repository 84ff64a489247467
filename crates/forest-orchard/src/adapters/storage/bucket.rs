//! # Buckets
//!
//! A bucket is an ordered `key -> value | bucket` map with its own sequence
//! counter. Read access goes through [`BucketRef`], write access through
//! [`BucketMut`], which records every mutation in the transaction's undo log.

use super::cursor::Cursor;
use crate::domain::errors::SubstrateError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One slot of a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum Entry {
    Value(Vec<u8>),
    Bucket(Bucket),
}

/// Ordered namespace of keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Bucket {
    pub(crate) entries: BTreeMap<Vec<u8>, Entry>,
    pub(crate) sequence: u64,
}

/// Inverse of one mutation.
#[derive(Debug)]
pub(crate) enum Undo {
    /// Restore `key` in the bucket at `path` to `previous` (remove if `None`).
    Entry {
        path: Vec<Vec<u8>>,
        key: Vec<u8>,
        previous: Option<Entry>,
    },
    /// Restore the sequence counter of the bucket at `path`.
    Sequence { path: Vec<Vec<u8>>, previous: u64 },
}

/// Final value of one location touched by a committed transaction.
///
/// Replaying a transaction's redo records over its pre-state yields its
/// post-state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum Redo {
    /// Set `key` in the bucket at `path` to `value` (remove if `None`).
    Entry {
        path: Vec<Vec<u8>>,
        key: Vec<u8>,
        value: Option<Entry>,
    },
    /// Set the sequence counter of the bucket at `path`.
    Sequence { path: Vec<Vec<u8>>, value: u64 },
}

impl Bucket {
    fn descend(&self, path: &[Vec<u8>]) -> Option<&Bucket> {
        let mut current = self;
        for segment in path {
            current = match current.entries.get(segment) {
                Some(Entry::Bucket(inner)) => inner,
                _ => return None,
            };
        }
        Some(current)
    }

    fn descend_mut(&mut self, path: &[Vec<u8>]) -> Option<&mut Bucket> {
        let mut current = self;
        for segment in path {
            current = match current.entries.get_mut(segment) {
                Some(Entry::Bucket(inner)) => inner,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Replay an undo log newest-first.
    pub(crate) fn rollback(&mut self, log: Vec<Undo>) {
        for undo in log.into_iter().rev() {
            match undo {
                Undo::Entry {
                    path,
                    key,
                    previous,
                } => {
                    if let Some(bucket) = self.descend_mut(&path) {
                        match previous {
                            Some(entry) => {
                                bucket.entries.insert(key, entry);
                            }
                            None => {
                                bucket.entries.remove(&key);
                            }
                        }
                    }
                }
                Undo::Sequence { path, previous } => {
                    if let Some(bucket) = self.descend_mut(&path) {
                        bucket.sequence = previous;
                    }
                }
            }
        }
    }

    /// Redo records for a transaction that produced this tree and `log`.
    ///
    /// One record per touched location, in order of first touch, carrying
    /// the location's current value. Locations whose bucket no longer
    /// exists are covered by the record that removed the bucket.
    pub(crate) fn redo_log(&self, log: &[Undo]) -> Vec<Redo> {
        let mut seen = HashSet::new();
        let mut redo = Vec::new();
        for undo in log {
            match undo {
                Undo::Entry { path, key, .. } => {
                    if !seen.insert((path, Some(key))) {
                        continue;
                    }
                    if let Some(bucket) = self.descend(path) {
                        redo.push(Redo::Entry {
                            path: path.clone(),
                            key: key.clone(),
                            value: bucket.entries.get(key).cloned(),
                        });
                    }
                }
                Undo::Sequence { path, .. } => {
                    if !seen.insert((path, None)) {
                        continue;
                    }
                    if let Some(bucket) = self.descend(path) {
                        redo.push(Redo::Sequence {
                            path: path.clone(),
                            value: bucket.sequence,
                        });
                    }
                }
            }
        }
        redo
    }

    /// Replay redo records oldest-first.
    pub(crate) fn apply(&mut self, log: Vec<Redo>) {
        for redo in log {
            match redo {
                Redo::Entry { path, key, value } => {
                    if let Some(bucket) = self.descend_mut(&path) {
                        match value {
                            Some(entry) => {
                                bucket.entries.insert(key, entry);
                            }
                            None => {
                                bucket.entries.remove(&key);
                            }
                        }
                    }
                }
                Redo::Sequence { path, value } => {
                    if let Some(bucket) = self.descend_mut(&path) {
                        bucket.sequence = value;
                    }
                }
            }
        }
    }
}

// =============================================================================
// READ ACCESS
// =============================================================================

/// Shared view of a bucket inside a read or write transaction.
#[derive(Clone, Copy)]
pub struct BucketRef<'a> {
    bucket: &'a Bucket,
}

impl<'a> BucketRef<'a> {
    pub(crate) fn new(bucket: &'a Bucket) -> Self {
        Self { bucket }
    }

    /// Value stored at `key`. Nested buckets yield `None`.
    pub fn get(&self, key: &[u8]) -> Option<&'a [u8]> {
        match self.bucket.entries.get(key) {
            Some(Entry::Value(value)) => Some(value.as_slice()),
            _ => None,
        }
    }

    /// Nested bucket stored at `key`.
    pub fn bucket(&self, key: &[u8]) -> Option<BucketRef<'a>> {
        match self.bucket.entries.get(key) {
            Some(Entry::Bucket(inner)) => Some(BucketRef::new(inner)),
            _ => None,
        }
    }

    pub fn cursor(&self) -> Cursor<'a> {
        Cursor::new(self.bucket)
    }

    /// Number of keys, values and nested buckets alike.
    pub fn len(&self) -> usize {
        self.bucket.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bucket.entries.is_empty()
    }

    /// Last value handed out by `next_sequence`.
    pub fn sequence(&self) -> u64 {
        self.bucket.sequence
    }
}

// =============================================================================
// WRITE ACCESS
// =============================================================================

/// Exclusive handle on a bucket inside a write transaction.
pub struct BucketMut<'t> {
    bucket: &'t mut Bucket,
    path: Vec<Vec<u8>>,
    undo: &'t mut Vec<Undo>,
}

impl<'t> BucketMut<'t> {
    pub(crate) fn root(bucket: &'t mut Bucket, undo: &'t mut Vec<Undo>) -> Self {
        Self {
            bucket,
            path: Vec::new(),
            undo,
        }
    }

    fn child_path(&self, key: &[u8]) -> Vec<Vec<u8>> {
        let mut path = self.path.clone();
        path.push(key.to_vec());
        path
    }

    fn record(&mut self, key: &[u8], previous: Option<Entry>) {
        self.undo.push(Undo::Entry {
            path: self.path.clone(),
            key: key.to_vec(),
            previous,
        });
    }

    /// Read-only view of this bucket.
    pub fn view(&self) -> BucketRef<'_> {
        BucketRef::new(&*self.bucket)
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        match self.bucket.entries.get(key) {
            Some(Entry::Value(value)) => Some(value.as_slice()),
            _ => None,
        }
    }

    /// Store `value` at `key`, replacing any previous value.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), SubstrateError> {
        if key.is_empty() {
            return Err(SubstrateError::KeyRequired);
        }
        if matches!(self.bucket.entries.get(key), Some(Entry::Bucket(_))) {
            return Err(SubstrateError::IncompatibleValue);
        }
        let previous = self
            .bucket
            .entries
            .insert(key.to_vec(), Entry::Value(value.to_vec()));
        self.record(key, previous);
        Ok(())
    }

    /// Remove the value at `key`. Absent keys are ignored.
    pub fn delete(&mut self, key: &[u8]) -> Result<(), SubstrateError> {
        match self.bucket.entries.get(key) {
            Some(Entry::Bucket(_)) => Err(SubstrateError::IncompatibleValue),
            Some(Entry::Value(_)) => {
                let previous = self.bucket.entries.remove(key);
                self.record(key, previous);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Nested bucket stored at `key`.
    pub fn bucket(&mut self, key: &[u8]) -> Option<BucketMut<'_>> {
        let path = self.child_path(key);
        match self.bucket.entries.get_mut(key) {
            Some(Entry::Bucket(inner)) => Some(BucketMut {
                bucket: inner,
                path,
                undo: &mut *self.undo,
            }),
            _ => None,
        }
    }

    /// Create a nested bucket at `key`, which must be free.
    pub fn create_bucket(&mut self, key: &[u8]) -> Result<BucketMut<'_>, SubstrateError> {
        match self.bucket.entries.get(key) {
            Some(Entry::Bucket(_)) => Err(SubstrateError::BucketExists(
                String::from_utf8_lossy(key).into_owned(),
            )),
            Some(Entry::Value(_)) => Err(SubstrateError::IncompatibleValue),
            None => self.create_bucket_if_not_exists(key),
        }
    }

    /// Nested bucket at `key`, created empty if absent.
    pub fn create_bucket_if_not_exists(
        &mut self,
        key: &[u8],
    ) -> Result<BucketMut<'_>, SubstrateError> {
        if key.is_empty() {
            return Err(SubstrateError::KeyRequired);
        }
        match self.bucket.entries.get(key) {
            Some(Entry::Value(_)) => return Err(SubstrateError::IncompatibleValue),
            Some(Entry::Bucket(_)) => {}
            None => {
                self.bucket
                    .entries
                    .insert(key.to_vec(), Entry::Bucket(Bucket::default()));
                self.record(key, None);
            }
        }
        self.bucket(key)
            .ok_or_else(|| SubstrateError::bucket_not_found(key))
    }

    /// Remove the nested bucket at `key` with everything inside it.
    pub fn delete_bucket(&mut self, key: &[u8]) -> Result<(), SubstrateError> {
        match self.bucket.entries.get(key) {
            Some(Entry::Value(_)) => Err(SubstrateError::IncompatibleValue),
            None => Err(SubstrateError::bucket_not_found(key)),
            Some(Entry::Bucket(_)) => {
                let previous = self.bucket.entries.remove(key);
                self.record(key, previous);
                Ok(())
            }
        }
    }

    /// Advance and return this bucket's sequence counter. The first call
    /// returns 1.
    pub fn next_sequence(&mut self) -> u64 {
        self.undo.push(Undo::Sequence {
            path: self.path.clone(),
            previous: self.bucket.sequence,
        });
        self.bucket.sequence += 1;
        self.bucket.sequence
    }
}
