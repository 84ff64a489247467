//! # Configuration
//!
//! Immutable configuration for an orchard, built once at open time and
//! threaded through explicitly.

use crate::adapters::storage::FileOptions;
use forest_types::NodeKind;
use std::time::Duration;

/// Names of the six top-level buckets.
///
/// These names are part of the on-disk format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketNames {
    pub reply: Vec<u8>,
    pub identity: Vec<u8>,
    pub community: Vec<u8>,
    /// Age index; holds one sub-bucket per kind, named after the kind's
    /// primary bucket.
    pub age: Vec<u8>,
    /// Type index: `id -> kind`.
    pub node_type: Vec<u8>,
    /// Children index: `parent id -> child id`.
    pub children: Vec<u8>,
}

impl Default for BucketNames {
    fn default() -> Self {
        Self {
            reply: b"Reply".to_vec(),
            identity: b"Identity".to_vec(),
            community: b"Community".to_vec(),
            age: b"Age".to_vec(),
            node_type: b"Type".to_vec(),
            children: b"Children".to_vec(),
        }
    }
}

impl BucketNames {
    /// Primary bucket holding records of `kind`.
    pub fn primary(&self, kind: NodeKind) -> &[u8] {
        match kind {
            NodeKind::Identity => &self.identity,
            NodeKind::Community => &self.community,
            NodeKind::Reply => &self.reply,
        }
    }

    /// Every top-level bucket, primary tables first.
    pub fn all(&self) -> [&[u8]; 6] {
        [
            &self.reply,
            &self.identity,
            &self.community,
            &self.age,
            &self.node_type,
            &self.children,
        ]
    }
}

/// Configuration for an orchard.
///
/// All configuration values have sensible defaults for production use.
#[derive(Debug, Clone)]
pub struct OrchardConfig {
    /// Bucket names (default: `Reply`, `Identity`, `Community`, `Age`,
    /// `Type`, `Children`).
    pub buckets: BucketNames,

    /// Maximum number of nodes held by the read cache (default: 4096).
    pub cache_capacity: usize,

    /// Whether every commit fsyncs the journal, and every checkpoint the
    /// snapshot and its directory (default: true).
    pub sync_writes: bool,

    /// Journal size in bytes after which a full snapshot is written
    /// (default: 4 MiB).
    pub checkpoint_bytes: u64,

    /// How long `open` waits for the database file lock (default: 1s).
    pub lock_timeout: Duration,
}

impl Default for OrchardConfig {
    fn default() -> Self {
        Self {
            buckets: BucketNames::default(),
            cache_capacity: 4096,
            sync_writes: true,
            checkpoint_bytes: 4 * 1024 * 1024,
            lock_timeout: Duration::from_secs(1),
        }
    }
}

impl OrchardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buckets(mut self, buckets: BucketNames) -> Self {
        self.buckets = buckets;
        self
    }

    /// Set the read-cache capacity. Zero is treated as one.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Enable or disable fsync on commit and checkpoint.
    ///
    /// Disabling is only safe when the machine cannot crash under the
    /// process: the OS may then persist a renamed snapshot before its
    /// contents, leaving a file that `open` rejects as corrupted, and may
    /// lose recently journaled commits.
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Set the journal size that triggers a snapshot.
    pub fn with_checkpoint_bytes(mut self, bytes: u64) -> Self {
        self.checkpoint_bytes = bytes;
        self
    }

    /// Durability settings for the database file.
    pub fn file_options(&self) -> FileOptions {
        FileOptions::default()
            .with_sync_writes(self.sync_writes)
            .with_checkpoint_bytes(self.checkpoint_bytes)
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }
}
