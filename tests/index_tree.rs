use std::collections::BTreeMap;

use arbor_index::{FillPolicy, IndexTree, PolicyKind, TreeConfig};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// The number of operations to perform in each proptest case.
const TEST_SIZE: usize = 2_000;

fn key_strategy() -> impl Strategy<Value = i64> {
    // Narrower than TEST_SIZE so inserts collide and removals hit.
    -500i64..500i64
}

// ─── Operations enum for driving randomized tests ────────────────────────────

#[derive(Debug, Clone)]
enum TreeOp {
    Insert(i64, i64),
    Remove(i64),
    Take(i64),
    Search(i64),
    ContainsKey(i64),
    Range(i64, i64),
    FirstKeyValue,
    LastKeyValue,
}

fn tree_op_strategy() -> impl Strategy<Value = TreeOp> {
    prop_oneof![
        5 => (key_strategy(), any::<i64>()).prop_map(|(k, v)| TreeOp::Insert(k, v)),
        3 => key_strategy().prop_map(TreeOp::Remove),
        1 => key_strategy().prop_map(TreeOp::Take),
        2 => key_strategy().prop_map(TreeOp::Search),
        1 => key_strategy().prop_map(TreeOp::ContainsKey),
        1 => (key_strategy(), key_strategy()).prop_map(|(lo, hi)| TreeOp::Range(lo, hi)),
        1 => Just(TreeOp::FirstKeyValue),
        1 => Just(TreeOp::LastKeyValue),
    ]
}

fn policy_strategy() -> impl Strategy<Value = PolicyKind> {
    prop_oneof![Just(PolicyKind::SplitMerge), Just(PolicyKind::RedistributeFirst)]
}

fn model_range(model: &BTreeMap<i64, i64>, lo: i64, hi: i64) -> Vec<(i64, i64)> {
    if lo > hi {
        return Vec::new();
    }
    model.range(lo..=hi).map(|(&k, &v)| (k, v)).collect()
}

fn tree_of(order: usize, kind: PolicyKind, keys: &[i64]) -> IndexTree<i64> {
    let mut tree = IndexTree::new(order, kind).unwrap();
    for &key in keys {
        tree.insert(key, key * 10);
    }
    tree.check_invariants().unwrap();
    tree
}

// ─── Model-based equivalence ─────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Replays a random operation sequence on an `IndexTree` and a `BTreeMap` and
    /// asserts identical results at every step.
    #[test]
    fn tree_ops_match_btreemap(
        order in 3usize..12,
        kind in policy_strategy(),
        ops in proptest::collection::vec(tree_op_strategy(), TEST_SIZE),
    ) {
        let mut tree: IndexTree<i64> = IndexTree::new(order, kind).unwrap();
        let mut model: BTreeMap<i64, i64> = BTreeMap::new();

        for op in ops {
            match op {
                TreeOp::Insert(k, v) => prop_assert_eq!(tree.insert(k, v), model.insert(k, v)),
                TreeOp::Remove(k) => prop_assert_eq!(tree.remove(k), model.remove(&k).is_some()),
                TreeOp::Take(k) => prop_assert_eq!(tree.take(k), model.remove(&k)),
                TreeOp::Search(k) => prop_assert_eq!(tree.search(k), model.get(&k)),
                TreeOp::ContainsKey(k) => {
                    prop_assert_eq!(tree.contains_key(k), model.contains_key(&k));
                }
                TreeOp::Range(lo, hi) => {
                    let got: Vec<(i64, i64)> = tree.range(lo, hi).map(|(k, &v)| (k, v)).collect();
                    prop_assert_eq!(got, model_range(&model, lo, hi));
                }
                TreeOp::FirstKeyValue => {
                    let expected = model.first_key_value().map(|(&k, v)| (k, v));
                    prop_assert_eq!(tree.first_key_value(), expected);
                }
                TreeOp::LastKeyValue => {
                    let expected = model.last_key_value().map(|(&k, v)| (k, v));
                    prop_assert_eq!(tree.last_key_value(), expected);
                }
            }
            prop_assert_eq!(tree.len(), model.len());
        }

        if let Err(err) = tree.check_invariants() {
            return Err(TestCaseError::fail(err.to_string()));
        }
        let dumped: Vec<(i64, i64)> = tree.in_order_dump().map(|(k, &v)| (k, v)).collect();
        let expected: Vec<(i64, i64)> = model.iter().map(|(&k, &v)| (k, v)).collect();
        prop_assert_eq!(&dumped, &expected);
        let reversed: Vec<i64> = tree.keys().rev().collect();
        prop_assert_eq!(reversed, model.keys().rev().copied().collect::<Vec<_>>());
    }

    /// Unique-key inserts dump back in strictly ascending order.
    #[test]
    fn dump_is_sorted_after_inserts(
        order in 3usize..8,
        kind in policy_strategy(),
        keys in proptest::collection::btree_set(-1_000_000_000i64..1_000_000_000, 0..300),
    ) {
        let mut shuffled: Vec<i64> = keys.iter().copied().collect();
        shuffled.reverse();
        let mid = shuffled.len() / 3;
        shuffled.rotate_left(mid);
        let tree = tree_of(order, kind, &shuffled);

        let dumped: Vec<i64> = tree.keys().collect();
        prop_assert!(dumped.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(dumped, keys.into_iter().collect::<Vec<_>>());
    }

    /// The leaf chain and a recursive descent agree on every tree shape.
    #[test]
    fn leaf_chain_matches_recursive_visit(
        order in 3usize..8,
        kind in policy_strategy(),
        inserts in proptest::collection::vec(key_strategy(), 0..400),
        removes in proptest::collection::vec(key_strategy(), 0..300),
    ) {
        let mut tree = tree_of(order, kind, &inserts);
        for key in removes {
            tree.remove(key);
        }
        let chained: Vec<(i64, &i64)> = tree.in_order_dump().collect();
        prop_assert_eq!(chained, tree.in_order_recursive());
    }

    /// `range_scan` returns exactly the payloads of keys inside `[lo, hi]`.
    #[test]
    fn range_scan_is_exact(
        order in 3usize..8,
        kind in policy_strategy(),
        keys in proptest::collection::vec(key_strategy(), 0..300),
        lo in key_strategy(),
        width in 0i64..200,
    ) {
        let tree = tree_of(order, kind, &keys);
        let hi = lo + width;
        let expected: Vec<i64> = keys
            .iter()
            .copied()
            .collect::<std::collections::BTreeSet<_>>()
            .range(lo..=hi)
            .map(|k| k * 10)
            .collect();
        let got: Vec<i64> = tree.range_scan(lo, hi).into_iter().copied().collect();
        prop_assert_eq!(got, expected);
    }
}

// ─── Construction ────────────────────────────────────────────────────────────

#[test]
fn rejects_orders_below_three() {
    for order in 0..3 {
        assert!(IndexTree::<String>::new(order, PolicyKind::SplitMerge).is_err());
        assert!(IndexTree::<String>::new(order, PolicyKind::RedistributeFirst).is_err());
    }
    let tree = IndexTree::<String>::new(3, PolicyKind::SplitMerge).unwrap();
    assert_eq!((tree.order(), tree.max_keys()), (3, 2));
    assert_eq!(tree.policy(), FillPolicy::SPLIT_MERGE);
}

#[test]
fn default_config_builds_an_order_four_split_merge_tree() {
    let mut tree = IndexTree::<String>::with_config(TreeConfig::default()).unwrap();
    assert_eq!((tree.order(), tree.max_keys()), (4, 3));
    assert_eq!(tree.policy(), FillPolicy::SPLIT_MERGE);
    assert_eq!(tree.config(), TreeConfig::default());

    for key in 1..=4 {
        tree.insert(key, key.to_string());
    }
    assert_eq!(tree.stats().leaf_splits, 1);
    assert_eq!(tree.height(), 2);

    let invalid = TreeConfig::new(2, PolicyKind::RedistributeFirst);
    assert!(IndexTree::<String>::with_config(invalid).is_err());
}

#[test]
fn fresh_tree_is_a_single_empty_leaf() {
    for kind in [PolicyKind::SplitMerge, PolicyKind::RedistributeFirst] {
        let tree = IndexTree::<String>::new(5, kind).unwrap();
        assert!(tree.is_empty());
        assert!(tree.has_root());
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.search(1), None);
        assert!(tree.range_scan(0, 100).is_empty());
    }
}

// ─── Point operations ────────────────────────────────────────────────────────

#[test]
fn removed_key_is_gone_and_second_remove_fails() {
    for kind in [PolicyKind::SplitMerge, PolicyKind::RedistributeFirst] {
        let mut tree = tree_of(3, kind, &(1..=50).collect::<Vec<_>>());
        for key in (1..=50).step_by(3) {
            assert!(tree.remove(key));
            assert_eq!(tree.search(key), None);
            assert!(!tree.remove(key));
            tree.check_invariants().unwrap();
        }
    }
}

#[test]
fn duplicate_insert_updates_in_place() {
    let mut tree = tree_of(3, PolicyKind::SplitMerge, &[1, 2, 3, 4]);
    let nodes = tree.node_count();
    let stats = tree.stats();

    assert_eq!(tree.insert(3, 999), Some(30));
    assert_eq!(tree.search(3), Some(&999));
    assert_eq!(tree.len(), 4);
    assert_eq!(tree.node_count(), nodes);
    assert_eq!(tree.stats(), stats);
}

#[test]
fn extreme_keys_route_correctly() {
    let keys = [i64::MIN, -1, 0, 1, i64::MAX];
    for kind in [PolicyKind::SplitMerge, PolicyKind::RedistributeFirst] {
        let mut tree = IndexTree::new(3, kind).unwrap();
        for key in keys {
            tree.insert(key, ());
        }
        tree.check_invariants().unwrap();
        assert_eq!(tree.keys().collect::<Vec<_>>(), keys);
        assert_eq!(tree.range(i64::MIN, i64::MAX).count(), keys.len());
        assert_eq!(tree.range(i64::MAX, i64::MAX).count(), 1);
    }
}

// ─── Range scans ─────────────────────────────────────────────────────────────

#[test]
fn range_scan_edge_cases() {
    let keys: Vec<i64> = (0..100).map(|k| k * 3).collect();
    let tree = tree_of(4, PolicyKind::RedistributeFirst, &keys);

    assert_eq!(tree.range_scan(30, 30), [&300]);
    assert!(tree.range_scan(31, 32).is_empty());
    assert!(tree.range_scan(50, 10).is_empty());
    assert!(tree.range_scan(1_000, 2_000).is_empty());
    assert!(tree.range_scan(-50, -1).is_empty());
    assert_eq!(tree.range_scan(-50, 3), [&0, &30]);
    assert_eq!(tree.range_scan(295, 10_000), [&2_970]);
}

// ─── Round trip ──────────────────────────────────────────────────────────────

/// Under split/merge, inserting a fresh key into a leaf with room and removing it
/// again leaves the tree exactly as it was.
#[test]
fn insert_then_remove_restores_shape() {
    // Ascending inserts at order 7 leave every leaf but the last at 3 of 6 keys.
    let mut tree = tree_of(7, PolicyKind::SplitMerge, &(0..60).map(|k| k * 2).collect::<Vec<_>>());
    for transient in [1, 37, 71] {
        let before_nodes = tree.node_count();
        let before: Vec<(i64, i64)> = tree.iter().map(|(k, &v)| (k, v)).collect();
        let before_stats = tree.stats();

        assert_eq!(tree.insert(transient, -1), None);
        assert!(tree.remove(transient));

        assert_eq!(tree.node_count(), before_nodes);
        assert_eq!(tree.iter().map(|(k, &v)| (k, v)).collect::<Vec<_>>(), before);
        assert_eq!(tree.stats(), before_stats);
        tree.check_invariants().unwrap();
    }
}

/// A key that lands in a full leaf splits it on insert. Removing the key leaves
/// both halves at the leaf floor, so nothing merges back.
#[test]
fn round_trip_through_a_full_leaf_keeps_the_split() {
    let mut tree = tree_of(3, PolicyKind::SplitMerge, &[0, 4]);
    assert_eq!(tree.node_count(), 1);

    tree.insert(2, 20);
    assert_eq!(tree.node_count(), 3);
    assert!(tree.remove(2));

    assert_eq!(tree.node_count(), 3);
    assert_eq!(tree.height(), 2);
    assert_eq!(tree.keys().collect::<Vec<_>>(), [0, 4]);
    assert_eq!(tree.stats().merges, 0);
    tree.check_invariants().unwrap();
}

#[test]
fn round_trip_on_single_leaf() {
    for kind in [PolicyKind::SplitMerge, PolicyKind::RedistributeFirst] {
        let mut tree = tree_of(5, kind, &[10, 20]);
        tree.insert(15, 150);
        assert!(tree.remove(15));
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.keys().collect::<Vec<_>>(), [10, 20]);
    }
}

// ─── Empty-tree lifecycle ────────────────────────────────────────────────────

#[test]
fn emptied_trees_differ_by_policy() {
    let mut split_merge = tree_of(3, PolicyKind::SplitMerge, &(1..=20).collect::<Vec<_>>());
    let mut redistribute = tree_of(3, PolicyKind::RedistributeFirst, &(1..=20).collect::<Vec<_>>());
    for key in 1..=20 {
        split_merge.remove(key);
        redistribute.remove(key);
    }

    assert!(split_merge.has_root());
    assert_eq!(split_merge.height(), 1);
    assert_eq!(split_merge.node_count(), 1);

    assert!(!redistribute.has_root());
    assert_eq!(redistribute.height(), 0);
    assert_eq!(redistribute.node_count(), 0);
    redistribute.check_invariants().unwrap();

    // Both accept inserts again.
    split_merge.insert(7, 70);
    redistribute.insert(7, 70);
    assert_eq!(split_merge.search(7), redistribute.search(7));
    assert!(redistribute.has_root());
    redistribute.check_invariants().unwrap();
}

#[test]
fn iter_clone_and_into_iterator() {
    let tree = tree_of(3, PolicyKind::SplitMerge, &[3, 1, 2]);
    let iter = tree.iter();
    let first_pass: Vec<i64> = iter.clone().map(|(k, _)| k).collect();
    let second_pass: Vec<i64> = iter.map(|(k, _)| k).collect();
    assert_eq!(first_pass, second_pass);

    let mut seen = Vec::new();
    for (key, value) in &tree {
        seen.push((key, *value));
    }
    assert_eq!(seen, [(1, 10), (2, 20), (3, 30)]);
}
