//! # Randomized Index Properties
//!
//! Paging, collision and removal behaviour over generated forests.

mod common;

use common::*;
use forest_types::{ForestNode, NodeKind, QualifiedHash, Reply};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_paging_is_exhaustive(count in 0usize..40, page in 1usize..9) {
        let orchard = make_test_orchard();
        let alice = identity("alice", 1);
        let c = community(&alice, "garden", 2);
        for i in 0..count {
            orchard.add(&node(&conversation(&c, &format!("m{i}"), 10))).unwrap();
        }

        let mut seen: Vec<QualifiedHash> = Vec::new();
        let mut offset = 0;
        loop {
            let (ids, returned) = orchard.children_batched(&c.id(), page, offset).unwrap();
            prop_assert_eq!(ids.len(), returned);
            prop_assert!(returned <= page);
            seen.extend(ids);
            offset += page;
            if returned < page {
                break;
            }
        }
        prop_assert_eq!(seen, orchard.children(&c.id()).unwrap());
    }

    #[test]
    fn prop_recent_orders_by_age_then_insertion(stamps in prop::collection::vec(1u64..6, 1..30)) {
        let orchard = make_test_orchard();
        let alice = identity("alice", 1);
        let c = community(&alice, "garden", 2);
        let replies: Vec<Reply> = stamps
            .iter()
            .enumerate()
            .map(|(i, ts)| conversation(&c, &format!("m{i}"), *ts))
            .collect();
        for r in &replies {
            orchard.add(&node(r)).unwrap();
        }

        // Youngest timestamp first; ties keep insertion order.
        let mut expected: Vec<(u64, usize)> =
            stamps.iter().copied().enumerate().map(|(i, ts)| (ts, i)).collect();
        expected.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        let expected: Vec<QualifiedHash> =
            expected.iter().map(|(_, i)| replies[*i].id()).collect();

        let recent: Vec<QualifiedHash> = orchard
            .recent(NodeKind::Reply, replies.len())
            .unwrap()
            .iter()
            .map(ForestNode::id)
            .collect();
        prop_assert_eq!(recent, expected);
    }

    #[test]
    fn prop_removal_keeps_the_rest(stamps in prop::collection::vec(1u64..4, 3..20), pick in any::<prop::sample::Index>()) {
        let orchard = make_test_orchard();
        let alice = identity("alice", 1);
        let c = community(&alice, "garden", 2);
        let replies: Vec<Reply> = stamps
            .iter()
            .enumerate()
            .map(|(i, ts)| conversation(&c, &format!("m{i}"), *ts))
            .collect();
        for r in &replies {
            orchard.add(&node(r)).unwrap();
        }

        let victim = pick.index(replies.len());
        orchard.remove_subtree(&replies[victim].id()).unwrap();

        let remaining: Vec<QualifiedHash> = replies
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != victim)
            .map(|(_, r)| r.id())
            .collect();
        prop_assert_eq!(orchard.children(&c.id()).unwrap(), remaining.clone());
        let recent = orchard.recent(NodeKind::Reply, replies.len()).unwrap();
        prop_assert_eq!(recent.len(), remaining.len());
        prop_assert!(recent.iter().all(|n| n.id() != replies[victim].id()));
    }
}
