use crate::service::Orchard;
use forest_types::{Community, ForestNode, Identity, Node, Reply, Timestamp};

pub fn make_test_orchard() -> Orchard {
    Orchard::in_memory().unwrap()
}

pub fn make_test_identity(name: &str, created: u64) -> Identity {
    Identity::new(name, name.as_bytes().to_vec(), vec![], Timestamp(created))
}

pub fn make_test_community(author: &Identity, name: &str, created: u64) -> Community {
    Community::new(author.id(), name, vec![], Timestamp(created))
}

pub fn make_test_conversation(community: &Community, content: &str, created: u64) -> Reply {
    Reply::conversation(community, community.author(), content, Timestamp(created))
}

pub fn make_test_reply(parent: &Reply, content: &str, created: u64) -> Reply {
    Reply::respond(parent, parent.author(), content, Timestamp(created))
}

/// Author `alice`, community `C` at 100, replies `R1` at 200 and `R2` at 300.
pub struct TestForest {
    pub author: Identity,
    pub community: Community,
    pub r1: Reply,
    pub r2: Reply,
}

impl TestForest {
    pub fn new() -> Self {
        let author = make_test_identity("alice", 50);
        let community = make_test_community(&author, "garden", 100);
        let r1 = make_test_conversation(&community, "first", 200);
        let r2 = make_test_conversation(&community, "second", 300);
        Self {
            author,
            community,
            r1,
            r2,
        }
    }

    pub fn nodes(&self) -> Vec<Node> {
        vec![
            self.author.clone().into(),
            self.community.clone().into(),
            self.r1.clone().into(),
            self.r2.clone().into(),
        ]
    }

    pub fn add_all(&self, orchard: &Orchard) {
        for node in self.nodes() {
            orchard.add(&node).unwrap();
        }
    }
}
