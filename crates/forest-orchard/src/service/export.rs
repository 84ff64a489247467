//! # Export
//!
//! Copying every stored node into another store.

use super::Orchard;
use crate::domain::errors::{CodecError, Context, OrchardError};
use crate::ports::outbound::NodeCodec;
use forest_types::{ForestNode, NodeKind, Store};

impl<C: NodeCodec> Orchard<C> {
    /// Add every node of this orchard to `other`.
    ///
    /// Records are read straight from the primary buckets and classified by
    /// their own bytes, so a damaged type index does not stop the export.
    /// `add` is idempotent on every store, so a failed copy can be rerun.
    pub fn copy_into(&self, other: &dyn Store) -> Result<(), OrchardError> {
        let buckets = &self.config.buckets;
        let records = self.db.view(|tx| {
            let mut records = Vec::new();
            for kind in NodeKind::ALL {
                let primary = tx
                    .bucket(buckets.primary(kind))
                    .context("reading primary bucket")?;
                let mut cursor = primary.cursor();
                let mut item = cursor.first();
                while let Some((_, value)) = item {
                    if let Some(record) = value {
                        records.push(record.to_vec());
                    }
                    item = cursor.next();
                }
            }
            Ok::<_, OrchardError>(records)
        })?;

        for record in &records {
            let kind = self
                .codec
                .kind_of(record)
                .context("classifying record for copy")?;
            let node = self
                .codec
                .decode(record)
                .context("decoding record for copy")?;
            if node.kind() != kind {
                return Err(OrchardError::Serialization {
                    context: "decoding record for copy",
                    source: CodecError::KindMismatch {
                        expected: kind,
                        found: node.kind(),
                    },
                });
            }
            other.add(&node).map_err(|source| OrchardError::Copy {
                id: node.id(),
                source,
            })?;
        }

        #[cfg(feature = "tracing-log")]
        tracing::info!(count = records.len(), "[orchard] 📤 Copied nodes into store");

        Ok(())
    }
}
