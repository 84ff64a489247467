//! Shared fixtures for the orchard integration tests.

#![allow(dead_code)]

use forest_orchard::Orchard;
use forest_types::{Community, ForestNode, Identity, Node, Reply, Timestamp};
use std::sync::Once;

static TRACING: Once = Once::new();

/// Route orchard logs to the test harness. Filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn make_test_orchard() -> Orchard {
    init_tracing();
    Orchard::in_memory().unwrap()
}

pub fn identity(name: &str, created: u64) -> Identity {
    Identity::new(name, vec![0xAA; 32], vec![], Timestamp(created))
}

pub fn community(author: &Identity, name: &str, created: u64) -> Community {
    Community::new(author.id(), name, vec![], Timestamp(created))
}

pub fn conversation(community: &Community, content: &str, created: u64) -> Reply {
    Reply::conversation(community, community.author(), content, Timestamp(created))
}

pub fn reply(parent: &Reply, content: &str, created: u64) -> Reply {
    Reply::respond(parent, parent.author(), content, Timestamp(created))
}

pub fn node<T: Clone + Into<Node>>(value: &T) -> Node {
    value.clone().into()
}
