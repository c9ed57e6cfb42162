extern crate std;

use std::{collections::BTreeSet, prelude::v1::*, ptr::NonNull};

use arbitrary::Arbitrary;
use cordyceps::Linked;
use proptest::strategy::{Just, Strategy};

use crate::{AvlTree, Links, TreeNode};

#[derive(Debug)]
#[repr(C)]
pub struct ModelNode {
    pub links: Links<ModelNode>,
    pub key: u32,
}

impl ModelNode {
    pub fn new(key: u32) -> Box<ModelNode> {
        Box::new(ModelNode {
            links: Links::new(),
            key,
        })
    }
}

unsafe impl Linked<Links<ModelNode>> for ModelNode {
    type Handle = Box<ModelNode>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        NonNull::new(Box::into_raw(r)).unwrap()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<ModelNode>> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}

impl TreeNode<Links<ModelNode>> for ModelNode {
    type Key = u32;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum KeyChoice {
    Existing(usize),
    Fresh(u32),
}

proptest::prop_compose! {
    fn existing_key_strategy()(
        index in 0usize..1000,
    ) -> KeyChoice {
        KeyChoice::Existing(index)
    }
}

proptest::prop_compose! {
    fn fresh_key_strategy()(
        random in 0u32..1000,
    ) -> KeyChoice {
        KeyChoice::Fresh(random)
    }
}

fn key_strategy() -> impl Strategy<Value = KeyChoice> {
    proptest::prop_oneof![existing_key_strategy(), fresh_key_strategy()]
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    Insert(KeyChoice),
    Find(KeyChoice),
    Remove(KeyChoice),
    GetIndex(usize),
    First,
    Last,
    Clear,
}

impl Op {
    fn resolve(self, sorted: &[u32]) -> Step {
        // Index values pick an existing key where possible, so removals and lookups hit often.
        fn pick_key(v: &[u32], i: KeyChoice) -> u32 {
            match i {
                KeyChoice::Existing(idx) => {
                    if v.is_empty() {
                        u32::try_from(idx).unwrap_or(u32::MAX)
                    } else {
                        v[idx % v.len()]
                    }
                }
                KeyChoice::Fresh(v) => v,
            }
        }

        match self {
            Op::Insert(item) => Step::Insert(pick_key(sorted, item)),
            Op::Find(item) => Step::Find(pick_key(sorted, item)),
            Op::Remove(item) => Step::Remove(pick_key(sorted, item)),
            // Aim a little past the end so that out-of-bounds lookups are covered too.
            Op::GetIndex(idx) => Step::GetIndex(idx % (sorted.len() + 2)),
            Op::First => Step::First,
            Op::Last => Step::Last,
            Op::Clear => Step::Clear,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum Step {
    Insert(u32),
    Find(u32),
    Remove(u32),
    GetIndex(usize),
    First,
    Last,
    Clear,
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    // Clearing is weighted down so that trees get a chance to grow.
    proptest::prop_oneof![
        8 => key_strategy().prop_map(Op::Insert),
        4 => key_strategy().prop_map(Op::Find),
        6 => key_strategy().prop_map(Op::Remove),
        2 => (0usize..1000).prop_map(Op::GetIndex),
        1 => Just(Op::First),
        1 => Just(Op::Last),
        1 => Just(Op::Clear),
    ]
}

/// Runs `ops` against both an [`AvlTree`] and a [`BTreeSet`], asserting that they agree and that
/// the tree invariants hold after every operation.
pub fn run_btree_equivalence(ops: Vec<Op>) {
    let mut mirror = Vec::with_capacity(ops.len());
    let mut btree = BTreeSet::new();
    let mut avl: AvlTree<ModelNode> = AvlTree::new();

    fn mirror_insert(v: &mut Vec<u32>, value: u32) {
        if let Err(idx) = v.binary_search(&value) {
            v.insert(idx, value);
        }
    }

    fn mirror_remove(v: &mut Vec<u32>, value: u32) {
        if let Ok(idx) = v.binary_search(&value) {
            v.remove(idx);
        }
    }

    #[inline]
    #[allow(clippy::boxed_local)]
    fn handle_key(node: Box<ModelNode>) -> u32 {
        node.key
    }

    #[inline]
    fn ranked_key(node: core::pin::Pin<&ModelNode>) -> u32 {
        node.key
    }

    for (step_no, op) in ops.into_iter().enumerate() {
        let step = op.resolve(&mirror);

        match step {
            Step::Insert(value) => {
                let from_btree = if btree.insert(value) {
                    None
                } else {
                    Some(value)
                };
                let from_avl = avl.insert(ModelNode::new(value)).map(handle_key);

                assert_eq!(from_btree, from_avl, "step #{step_no}: {step:?}");

                mirror_insert(&mut mirror, value);
            }

            Step::Find(value) => {
                let from_sorted = mirror.binary_search(&value).ok();
                let from_avl = avl.find(&value);

                assert_eq!(from_sorted, from_avl, "step #{step_no}: {step:?}");
                assert_eq!(btree.contains(&value), avl.contains_key(&value));
            }

            Step::Remove(value) => {
                let from_btree = btree.remove(&value).then_some(value);
                let from_avl = avl.remove(&value).map(handle_key);

                assert_eq!(from_btree, from_avl, "step #{step_no}: {step:?}");

                mirror_remove(&mut mirror, value);
            }

            Step::GetIndex(idx) => {
                let from_sorted = mirror.get(idx).copied();
                let from_avl = avl.get_index(idx).map(ranked_key);

                assert_eq!(from_sorted, from_avl, "step #{step_no}: {step:?}");
            }

            Step::First => {
                let from_btree = btree.first().copied();
                let from_avl = avl.first().map(ranked_key);

                assert_eq!(from_btree, from_avl, "step #{step_no}: {step:?}");
            }

            Step::Last => {
                let from_btree = btree.last().copied();
                let from_avl = avl.last().map(ranked_key);

                assert_eq!(from_btree, from_avl, "step #{step_no}: {step:?}");
            }

            Step::Clear => {
                btree.clear();
                mirror.clear();
                avl.clear();
            }
        }

        avl.assert_invariants();
        assert_eq!(btree.len(), avl.len());
        assert!(btree.iter().zip(avl.iter()).all(|(&a, b)| a == b.key));
    }
}

/// Inserts `keys` in order, then removes them in `removal_order`, asserting that the tree stays
/// balanced and correctly ranked after every single removal.
pub fn run_removal_balance(keys: Vec<u32>, removal_order: Vec<usize>) {
    let mut avl: AvlTree<ModelNode> = AvlTree::new();
    let mut present: Vec<u32> = Vec::new();

    for key in keys {
        if avl.insert(ModelNode::new(key)).is_none() {
            present.push(key);
        }
    }
    avl.assert_invariants();

    for pick in removal_order {
        if present.is_empty() {
            break;
        }

        let key = present.swap_remove(pick % present.len());
        let removed = avl.remove(&key).expect("present key must be removable");
        assert_eq!(removed.key, key);

        avl.assert_invariants();
        assert_eq!(avl.find(&key), None);
    }

    for key in present.drain(..) {
        assert!(avl.remove(&key).is_some());
        avl.assert_invariants();
    }

    assert!(avl.is_empty());
    assert_eq!(avl.iter().len(), 0);
}
