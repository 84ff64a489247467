//! # Node Read Cache (Generation-Tagged LRU)
//!
//! Recently seen nodes, keyed by id, behind one lock that is never held
//! across a substrate transaction.
//!
//! ## Problem
//!
//! A lookup reads the substrate, releases the transaction, then inserts into
//! the cache. A removal that runs between those two steps would have its
//! eviction undone by the late insert.
//!
//! ## Solution: Generation Counter
//!
//! Every eviction bumps a generation. A lookup samples the generation before
//! it reads the substrate and only inserts if nothing was evicted since.

use forest_types::{Node, QualifiedHash};
use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;

struct CacheState {
    entries: LruCache<QualifiedHash, Node>,
    generation: u64,
}

/// Bounded LRU cache of decoded nodes.
pub struct NodeCache {
    state: RwLock<CacheState>,
}

impl NodeCache {
    /// Create a cache holding at most `capacity` nodes. Zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: RwLock::new(CacheState {
                entries: LruCache::new(cap),
                generation: 0,
            }),
        }
    }

    /// Look up `id`, promoting it to most recently used.
    pub fn get(&self, id: &QualifiedHash) -> Option<Node> {
        self.state.write().entries.get(id).cloned()
    }

    pub fn contains(&self, id: &QualifiedHash) -> bool {
        self.state.read().entries.contains(id)
    }

    /// Current eviction generation. Sample before reading the substrate.
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    /// Insert `node` unless an eviction happened after `generation` was
    /// sampled. Returns whether the node was cached.
    pub fn insert_if_current(&self, id: QualifiedHash, node: Node, generation: u64) -> bool {
        let mut state = self.state.write();
        if state.generation != generation {
            return false;
        }
        state.entries.put(id, node);
        true
    }

    /// Drop `id` and invalidate in-flight inserts.
    pub fn evict(&self, id: &QualifiedHash) {
        let mut state = self.state.write();
        state.generation = state.generation.wrapping_add(1);
        state.entries.pop(id);
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.state.write();
        state.generation = state.generation.wrapping_add(1);
        state.entries.clear();
    }
}
