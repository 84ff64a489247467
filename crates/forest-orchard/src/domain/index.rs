//! # Collision-Tolerant Index
//!
//! Maps a byte key to one or many byte values inside a single bucket.
//!
//! ## Layout
//!
//! ```text
//! one value:     key -> value
//! many values:   key -> bucket { seq(1) -> v1, seq(2) -> v2, ... }
//! ```
//!
//! The second value put under a key migrates the first into a fresh
//! sub-bucket, so the sub-bucket iterates in insertion order. Sub-keys come
//! from the sub-bucket's own sequence counter and are never reused while the
//! sub-bucket exists.

use crate::adapters::storage::{BucketMut, BucketRef};
use crate::domain::errors::{Context, OrchardError};
use crate::domain::keys::sequence_key;

/// Write access to an index, inside a write transaction.
pub struct Index<'t> {
    bucket: BucketMut<'t>,
}

impl<'t> Index<'t> {
    pub fn new(bucket: BucketMut<'t>) -> Self {
        Self { bucket }
    }

    /// Add `value` under `key`, migrating to a collision group if needed.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), OrchardError> {
        if let Some(existing) = self.bucket.get(key).map(<[u8]>::to_vec) {
            self.bucket
                .delete(key)
                .context("removing colliding index entry")?;
            let mut group = self
                .bucket
                .create_bucket(key)
                .context("creating collision group")?;
            let first = group.next_sequence();
            group
                .put(&sequence_key(first), &existing)
                .context("migrating index entry into collision group")?;
            let next = group.next_sequence();
            return group
                .put(&sequence_key(next), value)
                .context("inserting into collision group");
        }

        if let Some(mut group) = self.bucket.bucket(key) {
            let next = group.next_sequence();
            return group
                .put(&sequence_key(next), value)
                .context("inserting into collision group");
        }

        self.bucket.put(key, value).context("inserting index entry")
    }

    /// Remove every value under `key`.
    pub fn delete(&mut self, key: &[u8]) -> Result<(), OrchardError> {
        if self.bucket.bucket(key).is_some() {
            return self
                .bucket
                .delete_bucket(key)
                .context("removing collision group");
        }
        self.bucket.delete(key).context("removing index entry")
    }

    /// Remove the first occurrence of `value` under `key`.
    ///
    /// A key without a collision group is deleted outright. A collision group
    /// left empty is removed.
    ///
    /// # Errors
    ///
    /// `OrchardError::NotFound` if the collision group under `key` does not
    /// hold `value`.
    pub fn delete_by_value(&mut self, key: &[u8], value: &[u8]) -> Result<(), OrchardError> {
        if self.bucket.bucket(key).is_none() {
            return self.bucket.delete(key).context("removing index entry");
        }

        let found = self
            .bucket
            .bucket(key)
            .and_then(|group| find_value(group.view(), value));
        let Some(sub_key) = found else {
            return Err(OrchardError::NotFound {
                key: hex::encode(key),
                value: hex::encode(value),
            });
        };

        let emptied = match self.bucket.bucket(key) {
            Some(mut group) => {
                group
                    .delete(&sub_key)
                    .context("removing value from collision group")?;
                group.view().is_empty()
            }
            None => false,
        };
        if emptied {
            self.bucket
                .delete_bucket(key)
                .context("removing empty collision group")?;
        }
        Ok(())
    }
}

fn find_value(group: BucketRef<'_>, value: &[u8]) -> Option<Vec<u8>> {
    let mut cursor = group.cursor();
    let mut item = cursor.first();
    while let Some((sub_key, stored)) = item {
        if stored == Some(value) {
            return Some(sub_key.to_vec());
        }
        item = cursor.next();
    }
    None
}

/// Read access to an index.
#[derive(Clone, Copy)]
pub struct IndexView<'a> {
    bucket: BucketRef<'a>,
}

impl<'a> IndexView<'a> {
    pub fn new(bucket: BucketRef<'a>) -> Self {
        Self { bucket }
    }

    /// Every value under `key`, in insertion order.
    pub fn values(&self, key: &[u8]) -> Vec<&'a [u8]> {
        self.window(key, 0, usize::MAX)
    }

    /// Up to `quantity` values under `key` after skipping `offset`, in
    /// insertion order. The walk stops after `offset + quantity` entries.
    pub fn window(&self, key: &[u8], offset: usize, quantity: usize) -> Vec<&'a [u8]> {
        if quantity == 0 {
            return Vec::new();
        }
        if let Some(value) = self.bucket.get(key) {
            return if offset == 0 { vec![value] } else { Vec::new() };
        }
        let Some(group) = self.bucket.bucket(key) else {
            return Vec::new();
        };

        let mut values = Vec::with_capacity(group.len().saturating_sub(offset).min(quantity));
        let mut skipped = 0;
        let mut cursor = group.cursor();
        let mut item = cursor.first();
        while let Some((_, stored)) = item {
            if let Some(value) = stored {
                if skipped < offset {
                    skipped += 1;
                } else {
                    values.push(value);
                    if values.len() == quantity {
                        break;
                    }
                }
            }
            item = cursor.next();
        }
        values
    }
}
