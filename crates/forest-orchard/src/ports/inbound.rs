//! # Inbound Ports (Driving Ports)
//!
//! The API the orchard exposes to message-ingestion layers.
//!
//! The generic store contract (`Store`, `Paginated`, `Copiable`) lives in
//! `forest-types` so that other stores can implement it too. The typed
//! recency queries below are specific to indexed stores.

pub use forest_types::{Copiable, Paginated, Store};

use forest_types::{Community, Identity, Reply, Timestamp};

/// Recency windows over the age index, returning concrete node types.
///
/// A zero timestamp yields nothing. Every query stops after `quantity`
/// results.
pub trait RecencyQueries {
    type Error;

    /// Replies created strictly before `ts`, youngest first.
    fn recent_replies(&self, ts: Timestamp, quantity: usize) -> Result<Vec<Reply>, Self::Error>;

    /// Replies created strictly after `ts`, oldest first.
    fn replies_after(&self, ts: Timestamp, quantity: usize) -> Result<Vec<Reply>, Self::Error>;

    /// Identities created strictly before `ts`, youngest first.
    fn recent_identities(
        &self,
        ts: Timestamp,
        quantity: usize,
    ) -> Result<Vec<Identity>, Self::Error>;

    /// Communities created strictly before `ts`, youngest first.
    fn recent_communities(
        &self,
        ts: Timestamp,
        quantity: usize,
    ) -> Result<Vec<Community>, Self::Error>;
}
