extern crate std;

use std::{ops::Range, prelude::v1::*};

use proptest::prelude::*;

use crate::model::{self, ModelNode};

use super::*;

fn insert_find_all(keys: &[u32]) {
    let mut tree: AvlTree<ModelNode> = AvlTree::new();

    for &key in keys {
        assert!(tree.insert(ModelNode::new(key)).is_none());
        tree.assert_invariants();
    }

    let mut sorted = keys.to_vec();
    sorted.sort_unstable();

    for key in keys {
        let node = tree.get_raw(key).expect("item not found");
        assert_eq!(unsafe { node.as_ref().key() }, key);

        let rank = tree.find(key).expect("rank not found");
        assert_eq!(sorted[rank], *key);
        assert_eq!(tree[rank].key, *key);
    }
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn two_elems_find() {
    insert_find_all(&[0, 1]);
    insert_find_all(&[1, 0]);
}

#[test]
fn three_elems_find() {
    insert_find_all(&[0, 1, 2]);
    insert_find_all(&[0, 2, 1]);
    insert_find_all(&[1, 0, 2]);
    insert_find_all(&[1, 2, 0]);
    insert_find_all(&[2, 0, 1]);
    insert_find_all(&[2, 1, 0]);
}

#[test]
fn four_elems_find() {
    insert_find_all(&[0, 1, 2, 3]);
    insert_find_all(&[0, 1, 3, 2]);
    insert_find_all(&[0, 2, 1, 3]);
    insert_find_all(&[0, 2, 3, 1]);
    insert_find_all(&[0, 3, 1, 2]);
    insert_find_all(&[0, 3, 2, 1]);

    insert_find_all(&[1, 0, 2, 3]);
    insert_find_all(&[1, 0, 3, 2]);
    insert_find_all(&[1, 2, 0, 3]);
    insert_find_all(&[1, 2, 3, 0]);
    insert_find_all(&[1, 3, 0, 2]);
    insert_find_all(&[1, 3, 2, 0]);

    insert_find_all(&[2, 0, 1, 3]);
    insert_find_all(&[2, 0, 3, 1]);
    insert_find_all(&[2, 1, 0, 3]);
    insert_find_all(&[2, 1, 3, 0]);
    insert_find_all(&[2, 3, 0, 1]);
    insert_find_all(&[2, 3, 1, 0]);

    insert_find_all(&[3, 0, 1, 2]);
    insert_find_all(&[3, 0, 2, 1]);
    insert_find_all(&[3, 1, 0, 2]);
    insert_find_all(&[3, 1, 2, 0]);
    insert_find_all(&[3, 2, 0, 1]);
    insert_find_all(&[3, 2, 1, 0]);
}

fn insert_remove_all(keys: &[u32]) {
    let mut tree: AvlTree<ModelNode> = AvlTree::new();

    for &key in keys {
        tree.insert(ModelNode::new(key));
        tree.assert_invariants();
    }

    for key in keys {
        let node = tree.remove(key).expect("item not found");
        assert_eq!(node.key, *key);
        tree.assert_invariants();
    }

    assert!(tree.is_empty());

    for &key in keys {
        tree.insert(ModelNode::new(key));
        tree.assert_invariants();
    }

    for key in keys.iter().rev() {
        let node = tree.remove(key).expect("item not found");
        assert_eq!(node.key, *key);
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
}

#[test]
fn remove_one() {
    insert_remove_all(&[0]);
}

#[test]
fn remove_two() {
    insert_remove_all(&[0, 1]);
    insert_remove_all(&[1, 0]);
}

#[test]
fn remove_three() {
    insert_remove_all(&[0, 1, 2]);
    insert_remove_all(&[0, 2, 1]);
    insert_remove_all(&[1, 0, 2]);
    insert_remove_all(&[1, 2, 0]);
    insert_remove_all(&[2, 0, 1]);
    insert_remove_all(&[2, 1, 0]);
}

#[test]
fn remove_four() {
    insert_remove_all(&[0, 1, 2, 3]);
    insert_remove_all(&[0, 1, 3, 2]);
    insert_remove_all(&[0, 2, 1, 3]);
    insert_remove_all(&[0, 2, 3, 1]);
    insert_remove_all(&[0, 3, 1, 2]);
    insert_remove_all(&[0, 3, 2, 1]);

    insert_remove_all(&[1, 0, 2, 3]);
    insert_remove_all(&[1, 0, 3, 2]);
    insert_remove_all(&[1, 2, 0, 3]);
    insert_remove_all(&[1, 2, 3, 0]);
    insert_remove_all(&[1, 3, 0, 2]);
    insert_remove_all(&[1, 3, 2, 0]);

    insert_remove_all(&[2, 0, 1, 3]);
    insert_remove_all(&[2, 0, 3, 1]);
    insert_remove_all(&[2, 1, 0, 3]);
    insert_remove_all(&[2, 1, 3, 0]);
    insert_remove_all(&[2, 3, 0, 1]);
    insert_remove_all(&[2, 3, 1, 0]);

    insert_remove_all(&[3, 0, 1, 2]);
    insert_remove_all(&[3, 0, 2, 1]);
    insert_remove_all(&[3, 1, 0, 2]);
    insert_remove_all(&[3, 1, 2, 0]);
    insert_remove_all(&[3, 2, 0, 1]);
    insert_remove_all(&[3, 2, 1, 0]);
}

#[test]
fn duplicate_is_handed_back() {
    let mut tree: AvlTree<ModelNode> = AvlTree::new();

    assert!(tree.insert(ModelNode::new(10)).is_none());
    let rejected = tree.insert(ModelNode::new(10)).expect("duplicate accepted");
    assert_eq!(rejected.key, 10);

    tree.assert_invariants();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].key, 10);
}

#[test]
fn single_rotations() {
    // Right-right and left-left chains both collapse into a perfect three-node tree.
    for keys in [[1, 2, 3], [3, 2, 1]] {
        let mut tree: AvlTree<ModelNode> = AvlTree::new();
        for key in keys {
            tree.insert(ModelNode::new(key));
        }
        tree.assert_invariants();

        assert_eq!(tree.height(), Some(1));
        assert_eq!(tree.root.map(|r| unsafe { r.as_ref().key }), Some(2));
    }
}

#[test]
fn double_rotations() {
    for keys in [[1, 3, 2], [3, 1, 2]] {
        let mut tree: AvlTree<ModelNode> = AvlTree::new();
        for key in keys {
            tree.insert(ModelNode::new(key));
        }
        tree.assert_invariants();

        assert_eq!(tree.height(), Some(1));
        assert_eq!(tree.root.map(|r| unsafe { r.as_ref().key }), Some(2));
    }
}

#[test]
fn ascending_seven_has_height_two() {
    let mut tree: AvlTree<ModelNode> = AvlTree::new();
    for key in 1..=7 {
        tree.insert(ModelNode::new(key));
        tree.assert_invariants();
    }

    assert_eq!(tree.height(), Some(2));
    assert_eq!(
        tree.iter().map(|node| node.key).collect::<Vec<_>>(),
        [1, 2, 3, 4, 5, 6, 7]
    );
}

#[test]
fn remove_root_with_two_children() {
    let mut tree: AvlTree<ModelNode> = AvlTree::new();
    for key in [5, 3, 8, 1, 4, 7, 9] {
        tree.insert(ModelNode::new(key));
    }

    let removed = tree.remove(&5).expect("root not removed");
    assert_eq!(removed.key, 5);
    tree.assert_invariants();

    // The successor takes the root's place.
    assert_eq!(tree.root.map(|r| unsafe { r.as_ref().key }), Some(7));
    assert_eq!(tree.find(&7), Some(3));
    assert_eq!(tree.find(&5), None);
    assert_eq!(tree.len(), 6);
}

#[test]
fn remove_root_without_right_subtree() {
    let mut tree: AvlTree<ModelNode> = AvlTree::new();
    for key in [2, 1] {
        tree.insert(ModelNode::new(key));
    }

    assert_eq!(tree.remove(&2).map(|n| n.key), Some(2));
    tree.assert_invariants();
    assert_eq!(tree.root.map(|r| unsafe { r.as_ref().key }), Some(1));
    assert_eq!(tree.find(&1), Some(0));
}

#[test]
fn remove_triggers_rebalance() {
    let mut tree: AvlTree<ModelNode> = AvlTree::new();
    for key in [4, 2, 6, 1, 3, 5, 7, 8] {
        tree.insert(ModelNode::new(key));
    }

    // Emptying the left side forces a rotation at the root.
    for key in [1, 3, 2] {
        assert!(tree.remove(&key).is_some());
        tree.assert_invariants();
    }

    assert_eq!(tree.height(), Some(2));
    assert_eq!(
        tree.iter().map(|node| node.key).collect::<Vec<_>>(),
        [4, 5, 6, 7, 8]
    );
}

#[test]
fn remove_missing_is_noop() {
    let mut tree: AvlTree<ModelNode> = AvlTree::new();
    assert!(tree.remove(&42).is_none());

    for key in [5, 3, 8] {
        tree.insert(ModelNode::new(key));
    }
    assert!(tree.remove(&4).is_none());
    assert!(tree.remove(&42).is_none());

    tree.assert_invariants();
    assert_eq!(tree.len(), 3);
}

#[test]
fn clear_drops_everything() {
    let mut tree: AvlTree<ModelNode> = AvlTree::new();
    for key in 0..100 {
        tree.insert(ModelNode::new(key * 7 % 101));
    }

    tree.clear();
    tree.assert_invariants();

    assert!(tree.is_empty());
    assert_eq!(tree.height(), None);
    assert!(tree.get_index(0).is_none());
    assert_eq!(tree.find(&7), None);
}

#[test]
fn emptiness_follows_length() {
    let mut tree: AvlTree<ModelNode> = AvlTree::new();
    assert!(tree.is_empty());
    tree.assert_invariants();

    tree.insert(ModelNode::new(3));
    assert!(!tree.is_empty());
    tree.assert_invariants();

    assert!(tree.remove(&3).is_some());
    assert!(tree.is_empty());
    assert_eq!(tree.len(), 0);
    tree.assert_invariants();
}

#[test]
fn reverse_iteration() {
    let mut tree: AvlTree<ModelNode> = AvlTree::new();
    for key in [9, 2, 7, 4] {
        tree.insert(ModelNode::new(key));
    }

    let iter = tree.iter();
    assert_eq!(iter.len(), 4);
    assert_eq!(iter.rev().map(|node| node.key).collect::<Vec<_>>(), [9, 7, 4, 2]);
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn btree_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_btree_equivalence(ops);
    }

    #[test]
    fn removals_keep_balance(
        keys in proptest::collection::vec(0u32..10_000, FUZZ_RANGE),
        removal_order in proptest::collection::vec(any::<usize>(), FUZZ_RANGE),
    ) {
        model::run_removal_balance(keys, removal_order);
    }
}
