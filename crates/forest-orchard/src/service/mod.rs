//! # Orchard Service
//!
//! The indexed forest store.
//!
//! ## Architecture
//!
//! The service:
//! 1. Writes every node into its kind's primary bucket and three indexes
//!    (type, age, children) in one update transaction
//! 2. Answers lookups through a bounded read cache
//! 3. Implements the `Store`, `Paginated` and `Copiable` contracts
//! 4. Takes the codec and substrate by injection
//!
//! ## Bucket Layout
//!
//! ```text
//! Reply / Identity / Community   id -> encoded node
//! Type                           id -> kind byte
//! Age / <kind bucket>            timestamp -> id     (collision index)
//! Children                       parent id -> id     (collision index)
//! ```

mod api;
mod export;
mod queries;
mod storage;
#[cfg(test)]
mod tests;

use crate::adapters::lock::DatabaseLock;
use crate::adapters::serializer::BincodeNodeCodec;
use crate::adapters::storage::Database;
use crate::domain::cache::NodeCache;
use crate::domain::config::OrchardConfig;
use crate::domain::errors::{Context, OrchardError};
use crate::ports::outbound::NodeCodec;
use forest_types::NodeKind;
use std::path::Path;

/// The orchard: a forest store over a bucketed key-value substrate.
///
/// Shared across threads by reference; every operation takes `&self`.
pub struct Orchard<C: NodeCodec = BincodeNodeCodec> {
    pub(crate) db: Database,
    pub(crate) cache: NodeCache,
    pub(crate) codec: C,
    pub(crate) config: OrchardConfig,
}

impl Orchard<BincodeNodeCodec> {
    /// Open (or create) the database file at `path` with default settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OrchardError> {
        Self::open_with(path, OrchardConfig::default(), BincodeNodeCodec::default())
    }

    /// A purely in-memory orchard with default settings.
    pub fn in_memory() -> Result<Self, OrchardError> {
        Self::using(
            Database::in_memory(),
            OrchardConfig::default(),
            BincodeNodeCodec::default(),
        )
    }
}

impl<C: NodeCodec> Orchard<C> {
    /// Open (or create) the database file at `path`.
    ///
    /// # Errors
    ///
    /// - `Lock`: another process holds `<path>.lock` past `lock_timeout`
    /// - `Transaction`: the file cannot be read or is not a database
    pub fn open_with(
        path: impl AsRef<Path>,
        config: OrchardConfig,
        codec: C,
    ) -> Result<Self, OrchardError> {
        let path = path.as_ref();
        let lock = DatabaseLock::acquire(path, config.lock_timeout)?;
        let db = Database::open(path, lock, config.file_options())
            .context("opening database file")?;
        Self::using(db, config, codec)
    }

    /// Wrap an already opened database, creating any missing buckets.
    pub fn using(db: Database, config: OrchardConfig, codec: C) -> Result<Self, OrchardError> {
        let buckets = &config.buckets;
        db.update(|tx| {
            for name in buckets.all() {
                tx.create_bucket_if_not_exists(name)
                    .context("creating top-level bucket")?;
            }
            let mut age = tx.bucket(&buckets.age).context("opening age index")?;
            for kind in NodeKind::ALL {
                age.create_bucket_if_not_exists(buckets.primary(kind))
                    .context("creating age index bucket")?;
            }
            Ok::<_, OrchardError>(())
        })?;

        #[cfg(feature = "tracing-log")]
        tracing::info!(
            path = ?db.path(),
            cache_capacity = config.cache_capacity,
            "[orchard] 🌳 Orchard ready"
        );

        Ok(Self {
            cache: NodeCache::new(config.cache_capacity),
            db,
            codec,
            config,
        })
    }

    /// The underlying substrate, for maintenance tooling.
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &OrchardConfig {
        &self.config
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }
}
