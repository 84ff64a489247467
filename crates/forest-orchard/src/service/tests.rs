//! # Orchard Service Tests

use super::*;
use crate::domain::errors::CodecError;
use crate::domain::index::{Index, IndexView};
use crate::domain::keys::{encode_id, encode_timestamp};
use crate::ports::inbound::RecencyQueries;
use crate::test_utils::{
    make_test_conversation, make_test_identity, make_test_orchard, make_test_reply, TestForest,
};
use forest_types::{
    Copiable, ForestNode, MemoryStore, Node, QualifiedHash, Reply, Store, StoreError, Timestamp,
};

fn ids(nodes: &[Node]) -> Vec<QualifiedHash> {
    nodes.iter().map(ForestNode::id).collect()
}

/// Every value of `key` in the age index of `kind`.
fn age_entries(orchard: &Orchard, kind: NodeKind, ts: u64) -> Vec<Vec<u8>> {
    let buckets = &orchard.config.buckets;
    orchard
        .db
        .view(|tx| {
            let age = tx.bucket(&buckets.age)?.bucket(buckets.primary(kind)).unwrap();
            Ok::<_, OrchardError>(
                IndexView::new(age)
                    .values(&encode_timestamp(Timestamp(ts)))
                    .into_iter()
                    .map(<[u8]>::to_vec)
                    .collect(),
            )
        })
        .unwrap()
}

fn type_entry(orchard: &Orchard, id: &QualifiedHash) -> Option<Vec<u8>> {
    orchard
        .db
        .view(|tx| {
            Ok::<_, OrchardError>(
                tx.bucket(&orchard.config.buckets.node_type)?
                    .get(&encode_id(id))
                    .map(<[u8]>::to_vec),
            )
        })
        .unwrap()
}

/// Store `record` as a reply with an age entry at `ts`, bypassing `add`.
fn put_raw_reply(orchard: &Orchard, key: &QualifiedHash, record: &[u8], ts: u64) {
    let buckets = &orchard.config.buckets;
    orchard
        .db
        .update(|tx| {
            tx.bucket(&buckets.reply)?.put(&encode_id(key), record)?;
            let mut age = tx.bucket(&buckets.age)?;
            let by_kind = age.bucket(&buckets.reply).unwrap();
            Index::new(by_kind).put(&encode_timestamp(Timestamp(ts)), &encode_id(key))
        })
        .unwrap();
}

// =============================================================================
// OPEN
// =============================================================================

#[test]
fn test_using_creates_all_buckets() {
    let orchard = make_test_orchard();
    let buckets = &orchard.config.buckets;
    orchard
        .db
        .view(|tx| {
            for name in buckets.all() {
                tx.bucket(name)?;
            }
            let age = tx.bucket(&buckets.age)?;
            for kind in NodeKind::ALL {
                assert!(age.bucket(buckets.primary(kind)).is_some());
            }
            Ok::<_, OrchardError>(())
        })
        .unwrap();
}

// =============================================================================
// ADD / GET
// =============================================================================

#[test]
fn test_add_and_get_every_kind() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    forest.add_all(&orchard);

    for node in forest.nodes() {
        assert_eq!(orchard.get(&node.id()).unwrap(), Some(node.clone()));
        assert_eq!(
            type_entry(&orchard, &node.id()),
            Some(vec![node.kind().tag()])
        );
    }
    assert_eq!(orchard.get(&QualifiedHash::of_bytes(b"nope")).unwrap(), None);
}

#[test]
fn test_add_is_idempotent() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    forest.add_all(&orchard);
    forest.add_all(&orchard);

    assert_eq!(
        orchard.children(&forest.community.id()).unwrap(),
        vec![forest.r1.id(), forest.r2.id()]
    );
    assert_eq!(orchard.recent(NodeKind::Reply, 10).unwrap().len(), 2);
    assert_eq!(age_entries(&orchard, NodeKind::Reply, 200).len(), 1);
}

#[test]
fn test_add_without_cache_entry_still_idempotent() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    orchard.add(&forest.r1.clone().into()).unwrap();
    orchard.cache.clear();
    orchard.add(&forest.r1.clone().into()).unwrap();
    assert_eq!(orchard.children(&forest.community.id()).unwrap().len(), 1);
}

#[test]
fn test_get_populates_cache() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    forest.add_all(&orchard);
    orchard.cache.clear();

    let id = forest.r1.id();
    assert!(!orchard.cache.contains(&id));
    orchard.get(&id).unwrap();
    assert!(orchard.cache.contains(&id));
}

#[test]
fn test_get_rejects_unknown_kind_byte() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    forest.add_all(&orchard);
    orchard.cache.clear();

    let id = forest.r1.id();
    orchard
        .db
        .update(|tx| {
            tx.bucket(&orchard.config.buckets.node_type)?
                .put(&encode_id(&id), &[7])
        })
        .unwrap();
    assert!(matches!(orchard.get(&id), Err(OrchardError::UnknownKind(7))));
}

#[test]
fn test_get_reports_dangling_type_entry() {
    let orchard = make_test_orchard();
    let id = QualifiedHash::of_bytes(b"ghost");
    orchard
        .db
        .update(|tx| {
            tx.bucket(&orchard.config.buckets.node_type)?
                .put(&encode_id(&id), &[NodeKind::Reply.tag()])
        })
        .unwrap();
    assert!(matches!(
        orchard.get(&id),
        Err(OrchardError::DanglingEntry { .. })
    ));
}

#[test]
fn test_get_rejects_tampered_record() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    forest.add_all(&orchard);
    orchard.cache.clear();

    // Store R2's bytes under R1's id.
    let forged = orchard.codec.encode(&forest.r2.clone().into()).unwrap();
    orchard
        .db
        .update(|tx| {
            tx.bucket(&orchard.config.buckets.reply)?
                .put(&encode_id(&forest.r1.id()), &forged)
        })
        .unwrap();

    assert!(matches!(
        orchard.get(&forest.r1.id()),
        Err(OrchardError::Serialization {
            source: CodecError::IdMismatch { .. },
            ..
        })
    ));

    let mut corrupted = forged.clone();
    let last = corrupted.len() - 5;
    corrupted[last] ^= 0xff;
    orchard
        .db
        .update(|tx| {
            tx.bucket(&orchard.config.buckets.reply)?
                .put(&encode_id(&forest.r2.id()), &corrupted)
        })
        .unwrap();
    orchard.cache.clear();
    assert!(matches!(
        orchard.get(&forest.r2.id()),
        Err(OrchardError::Serialization { .. })
    ));
}

#[test]
fn test_typed_getters_filter_by_kind() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    forest.add_all(&orchard);

    let community_id = forest.community.id();
    assert_eq!(
        orchard.get_community(&community_id).unwrap(),
        Some(forest.community.clone())
    );
    assert_eq!(orchard.get_identity(&community_id).unwrap(), None);
    assert_eq!(
        orchard
            .get_conversation(&community_id, &forest.r1.id())
            .unwrap(),
        Some(forest.r1.clone())
    );
    assert_eq!(
        orchard
            .get_reply(&community_id, &forest.r1.id(), &forest.r2.id())
            .unwrap(),
        Some(forest.r2.clone())
    );
    assert_eq!(
        orchard.get_identity(&forest.author.id()).unwrap(),
        Some(forest.author.clone())
    );
}

// =============================================================================
// CHILDREN
// =============================================================================

#[test]
fn test_children_in_insertion_order() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    orchard.add(&forest.community.clone().into()).unwrap();
    orchard.add(&forest.r2.clone().into()).unwrap();
    orchard.add(&forest.r1.clone().into()).unwrap();

    assert_eq!(
        orchard.children(&forest.community.id()).unwrap(),
        vec![forest.r2.id(), forest.r1.id()]
    );
    assert!(orchard.children(&forest.r1.id()).unwrap().is_empty());
}

#[test]
fn test_children_batched_pages() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    orchard.add(&forest.community.clone().into()).unwrap();
    let replies: Vec<Reply> = (0..5)
        .map(|i| make_test_conversation(&forest.community, &format!("r{i}"), 200 + i))
        .collect();
    for reply in &replies {
        orchard.add(&reply.clone().into()).unwrap();
    }
    let parent = forest.community.id();

    let (page, count) = orchard.children_batched(&parent, 2, 0).unwrap();
    assert_eq!((page, count), (vec![replies[0].id(), replies[1].id()], 2));
    let (page, count) = orchard.children_batched(&parent, 2, 4).unwrap();
    assert_eq!((page, count), (vec![replies[4].id()], 1));
    let (page, count) = orchard.children_batched(&parent, 2, 5).unwrap();
    assert!(page.is_empty());
    assert_eq!(count, 0);
    assert_eq!(orchard.children_batched(&parent, 0, 0).unwrap().1, 0);
}

#[test]
fn test_children_batched_single_child() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    orchard.add(&forest.r1.clone().into()).unwrap();
    let parent = forest.community.id();

    assert_eq!(
        orchard.children_batched(&parent, 10, 0).unwrap(),
        (vec![forest.r1.id()], 1)
    );
    assert_eq!(orchard.children_batched(&parent, 10, 1).unwrap(), (vec![], 0));
}

// =============================================================================
// RECENCY
// =============================================================================

#[test]
fn test_recent_youngest_first() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    forest.add_all(&orchard);

    let recent = orchard.recent(NodeKind::Reply, 2).unwrap();
    assert_eq!(ids(&recent), vec![forest.r2.id(), forest.r1.id()]);
    assert_eq!(
        ids(&orchard.recent(NodeKind::Reply, 1).unwrap()),
        vec![forest.r2.id()]
    );
    assert!(orchard.recent(NodeKind::Reply, 0).unwrap().is_empty());
    assert_eq!(
        ids(&orchard.recent(NodeKind::Identity, 5).unwrap()),
        vec![forest.author.id()]
    );
}

#[test]
fn test_recent_with_shared_timestamps() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    let same: Vec<Reply> = ["a", "b", "c"]
        .iter()
        .map(|content| make_test_conversation(&forest.community, content, 500))
        .collect();
    orchard.add(&forest.r1.clone().into()).unwrap();
    for reply in &same {
        orchard.add(&reply.clone().into()).unwrap();
    }

    let recent = orchard.recent(NodeKind::Reply, 10).unwrap();
    assert_eq!(
        ids(&recent),
        vec![same[0].id(), same[1].id(), same[2].id(), forest.r1.id()]
    );

    orchard.remove_subtree(&same[1].id()).unwrap();
    let recent = orchard.recent(NodeKind::Reply, 10).unwrap();
    assert_eq!(
        ids(&recent),
        vec![same[0].id(), same[2].id(), forest.r1.id()]
    );
}

#[test]
fn test_recent_collects_decode_failures() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    forest.add_all(&orchard);
    put_raw_reply(&orchard, &QualifiedHash::of_bytes(b"junk"), b"junk", 250);

    match orchard.recent(NodeKind::Reply, 10) {
        Err(OrchardError::PartialDecode { nodes, errors }) => {
            assert_eq!(ids(&nodes), vec![forest.r2.id(), forest.r1.id()]);
            assert_eq!(errors.len(), 1);
            assert!(matches!(errors[0], OrchardError::Serialization { .. }));
        }
        other => panic!("expected partial decode, got {other:?}"),
    }

    let err = Store::recent(&orchard, NodeKind::Reply, 10).unwrap_err();
    assert_eq!(err.salvaged_nodes().len(), 2);
}

#[test]
fn test_recent_flags_wrong_kind_record() {
    let orchard = make_test_orchard();
    let identity = make_test_identity("stray", 5);
    let record = orchard.codec.encode(&identity.clone().into()).unwrap();
    put_raw_reply(&orchard, &identity.id(), &record, 5);

    match orchard.recent(NodeKind::Reply, 10) {
        Err(OrchardError::PartialDecode { nodes, errors }) => {
            assert!(nodes.is_empty());
            assert!(matches!(
                errors[0],
                OrchardError::Serialization {
                    source: CodecError::KindMismatch { .. },
                    ..
                }
            ));
        }
        other => panic!("expected partial decode, got {other:?}"),
    }
}

#[test]
fn test_recent_replies_before_and_after() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    forest.add_all(&orchard);
    let r3 = make_test_reply(&forest.r2, "third", 400);
    orchard.add(&r3.clone().into()).unwrap();

    let before = orchard.recent_replies(Timestamp(400), 10).unwrap();
    assert_eq!(before, vec![forest.r2.clone(), forest.r1.clone()]);
    let before = orchard.recent_replies(Timestamp(301), 1).unwrap();
    assert_eq!(before, vec![forest.r2.clone()]);
    assert!(orchard.recent_replies(Timestamp(200), 10).unwrap().is_empty());

    let after = orchard.replies_after(Timestamp(200), 10).unwrap();
    assert_eq!(after, vec![forest.r2.clone(), r3.clone()]);
    let after = orchard.replies_after(Timestamp(1), 1).unwrap();
    assert_eq!(after, vec![forest.r1.clone()]);

    assert!(orchard.recent_replies(Timestamp(0), 10).unwrap().is_empty());
    assert!(orchard.replies_after(Timestamp(0), 10).unwrap().is_empty());
}

#[test]
fn test_recent_identities_and_communities() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    forest.add_all(&orchard);
    let bob = make_test_identity("bob", 60);
    orchard.add(&bob.clone().into()).unwrap();

    assert_eq!(
        orchard.recent_identities(Timestamp(1000), 10).unwrap(),
        vec![bob, forest.author.clone()]
    );
    assert_eq!(
        orchard.recent_communities(Timestamp(1000), 10).unwrap(),
        vec![forest.community.clone()]
    );
    assert!(orchard
        .recent_communities(Timestamp(100), 10)
        .unwrap()
        .is_empty());
}

#[test]
fn test_recent_from_dispatches_by_kind() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    forest.add_all(&orchard);

    assert_eq!(
        ids(&orchard.recent_from(NodeKind::Reply, Timestamp(1000), 10).unwrap()),
        vec![forest.r2.id(), forest.r1.id()]
    );
    assert_eq!(
        ids(&orchard.recent_from(NodeKind::Community, Timestamp(1000), 10).unwrap()),
        vec![forest.community.id()]
    );
    assert_eq!(
        ids(&orchard.recent_from(NodeKind::Identity, Timestamp(1000), 10).unwrap()),
        vec![forest.author.id()]
    );
}

// =============================================================================
// REMOVAL
// =============================================================================

#[test]
fn test_remove_subtree_clears_every_index() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    forest.add_all(&orchard);
    let grandchild = make_test_reply(&forest.r1, "deep", 250);
    orchard.add(&grandchild.clone().into()).unwrap();

    orchard.remove_subtree(&forest.community.id()).unwrap();

    for id in [
        forest.community.id(),
        forest.r1.id(),
        forest.r2.id(),
        grandchild.id(),
    ] {
        assert_eq!(orchard.get(&id).unwrap(), None);
        assert!(!orchard.cache.contains(&id));
        assert_eq!(type_entry(&orchard, &id), None);
        assert!(orchard.children(&id).unwrap().is_empty());
    }
    for ts in [100, 200, 250, 300] {
        assert!(age_entries(&orchard, NodeKind::Reply, ts).is_empty());
        assert!(age_entries(&orchard, NodeKind::Community, ts).is_empty());
    }

    // The author is a separate root and survives.
    assert_eq!(
        orchard.children(&QualifiedHash::null()).unwrap(),
        vec![forest.author.id()]
    );
    assert!(orchard.get(&forest.author.id()).unwrap().is_some());
}

#[test]
fn test_remove_subtree_keeps_siblings() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    forest.add_all(&orchard);

    orchard.remove_subtree(&forest.r1.id()).unwrap();
    assert_eq!(
        orchard.children(&forest.community.id()).unwrap(),
        vec![forest.r2.id()]
    );
    assert_eq!(
        ids(&orchard.recent(NodeKind::Reply, 10).unwrap()),
        vec![forest.r2.id()]
    );
}

#[test]
fn test_remove_absent_subtree_is_noop() {
    let orchard = make_test_orchard();
    orchard
        .remove_subtree(&QualifiedHash::of_bytes(b"never stored"))
        .unwrap();

    let forest = TestForest::new();
    forest.add_all(&orchard);
    orchard.remove_subtree(&forest.r1.id()).unwrap();
    orchard.remove_subtree(&forest.r1.id()).unwrap();
}

#[test]
fn test_removed_node_can_be_added_again() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    forest.add_all(&orchard);

    orchard.remove_subtree(&forest.r2.id()).unwrap();
    orchard.add(&forest.r2.clone().into()).unwrap();
    assert_eq!(
        orchard.children(&forest.community.id()).unwrap(),
        vec![forest.r1.id(), forest.r2.id()]
    );
}

#[test]
fn test_child_added_after_discovery_is_not_orphaned() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    let community: Node = forest.community.clone().into();
    orchard.add(&forest.author.clone().into()).unwrap();
    orchard.add(&community).unwrap();

    // Discovery found no children; a reply then lands under the community
    // before its delete transaction runs.
    assert!(orchard.children(&community.id()).unwrap().is_empty());
    orchard.add(&forest.r1.clone().into()).unwrap();

    assert!(!orchard.delete_node(&community).unwrap());
    assert!(orchard.get(&community.id()).unwrap().is_some());
    assert_eq!(
        orchard.children(&community.id()).unwrap(),
        vec![forest.r1.id()]
    );

    orchard.remove_subtree(&community.id()).unwrap();
    assert_eq!(orchard.get(&community.id()).unwrap(), None);
    assert_eq!(orchard.get(&forest.r1.id()).unwrap(), None);
    assert_eq!(type_entry(&orchard, &forest.r1.id()), None);
    assert!(orchard
        .recent_replies(Timestamp(u64::MAX), 10)
        .unwrap()
        .is_empty());
}

#[test]
fn test_delete_node_twice_is_harmless() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    forest.add_all(&orchard);
    let r1: Node = forest.r1.clone().into();

    assert!(orchard.delete_node(&r1).unwrap());
    assert!(orchard.delete_node(&r1).unwrap());
    assert_eq!(
        orchard.children(&forest.community.id()).unwrap(),
        vec![forest.r2.id()]
    );
}

#[test]
fn test_remove_subtree_drops_links_to_missing_children() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    forest.add_all(&orchard);

    // R1 vanishes from its tables but stays linked under the community.
    let buckets = &orchard.config.buckets;
    let r1 = encode_id(&forest.r1.id());
    orchard
        .db
        .update(|tx| {
            tx.bucket(&buckets.reply)?.delete(&r1)?;
            tx.bucket(&buckets.node_type)?.delete(&r1)?;
            Ok::<_, OrchardError>(())
        })
        .unwrap();
    orchard.cache.clear();

    orchard.remove_subtree(&forest.community.id()).unwrap();
    assert_eq!(orchard.get(&forest.community.id()).unwrap(), None);
    assert!(orchard
        .children(&forest.community.id())
        .unwrap()
        .is_empty());
}

// =============================================================================
// EXPORT
// =============================================================================

#[test]
fn test_copy_into_memory_store() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    forest.add_all(&orchard);

    let target = MemoryStore::new();
    orchard.copy_into(&target).unwrap();
    for node in forest.nodes() {
        assert_eq!(target.get(&node.id()).unwrap(), Some(node.clone()));
    }
    assert_eq!(
        target.children(&forest.community.id()).unwrap().len(),
        2
    );

    // Rerunning is harmless.
    orchard.copy_into(&target).unwrap();
    assert_eq!(
        target.children(&forest.community.id()).unwrap().len(),
        2
    );
}

#[test]
fn test_copy_into_ignores_type_index() {
    let orchard = make_test_orchard();
    let forest = TestForest::new();
    forest.add_all(&orchard);
    orchard
        .db
        .update(|tx| {
            tx.delete_bucket(&orchard.config.buckets.node_type)?;
            tx.create_bucket_if_not_exists(&orchard.config.buckets.node_type)?;
            Ok::<_, OrchardError>(())
        })
        .unwrap();

    let target = make_test_orchard();
    orchard.copy_into(&target).unwrap();
    assert_eq!(target.recent(NodeKind::Reply, 10).unwrap().len(), 2);
}

#[test]
fn test_copy_into_stops_on_undecodable_record() {
    let orchard = make_test_orchard();
    put_raw_reply(&orchard, &QualifiedHash::of_bytes(b"junk"), b"ju", 9);

    let target = MemoryStore::new();
    assert!(matches!(
        orchard.copy_into(&target),
        Err(OrchardError::Serialization {
            source: CodecError::Truncated { len: 2 },
            ..
        })
    ));
    assert!(matches!(
        Copiable::copy_into(&orchard, &target),
        Err(StoreError::Serialization(_))
    ));
}
