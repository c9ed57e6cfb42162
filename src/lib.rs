//! An intrusive AVL tree with O(1) rank-indexed access.
//!
//! Alongside the usual search tree links, every node carries its rank (0-based position in sorted
//! order), and the tree keeps a rank projection: a dense array of node pointers in ascending key
//! order. The projection is rebuilt from scratch after every insertion and removal, so
//! [`AvlTree::find`] reports ranks and [`AvlTree::get_index`] resolves them in constant time.
//!
//! Conventions used in comments:
//! - The height of a node `x` is denoted `h(x)`. A missing subtree has height -1, a leaf 0.
//! - The balance factor of `x` is `h(right(x)) - h(left(x))`.
//!
//! The invariants of the tree, holding after every completed mutation, are:
//! 1. `h(x) = 1 + max(h(left(x)), h(right(x)))` for every node.
//! 2. Every balance factor is -1, 0 or 1.
//! 3. Every key in the left subtree of `x` is less than the key of `x`, every key in the right
//!    subtree greater.
//! 4. The rank projection is the in-order traversal of the tree, and `index(x)` is the position of
//!    `x` in it.
#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

use alloc::vec::Vec;
use core::{
    borrow::Borrow,
    cell::UnsafeCell,
    cmp::Ordering,
    fmt,
    marker::PhantomPinned,
    mem,
    ops::{Index, Not},
    pin::Pin,
    ptr::NonNull,
};

use cordyceps::Linked;

#[cfg(feature = "print")]
mod debug;
mod iter;
#[cfg(any(test, feature = "model"))]
pub mod model;
mod set;

#[cfg(test)]
mod tests;

#[cfg(feature = "print")]
pub use debug::Sideways;
pub use iter::Iter;
pub use set::{Keys, SearchTree, SetNode};

pub trait TreeNode<L>: Linked<L> {
    type Key: Ord + fmt::Debug;

    fn key(&self) -> &Self::Key;
}

/// An intrusive AVL tree with a maintained rank projection.
///
/// Keys are unique. Searching, inserting and removing walk a single root-to-leaf path, but each
/// insertion and removal also rebuilds the rank projection, which costs _O(n)_.
pub struct AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    root: Link<T>,
    ranks: Vec<NonNull<T>>,
    len: usize,
}

pub struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[repr(C)]
struct LinksInner<T: ?Sized> {
    parent: Link<T>,
    children: [Link<T>; 2],
    height: i8,
    // Stale while a mutation is in progress.
    index: usize,
    _unpin: PhantomPinned,
}

type Link<T> = Option<NonNull<T>>;

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a new empty tree.
    pub const fn new() -> AvlTree<T> {
        AvlTree {
            root: None,
            ranks: Vec::new(),
            len: 0,
        }
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns the height of the tree, or `None` if it is empty.
    ///
    /// A tree holding a single element has height 0.
    pub fn height(&self) -> Option<u8> {
        let root = self.root?;
        let height = unsafe { T::links(root).as_ref().height() };
        u8::try_from(height).ok()
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let mut in_order = Vec::with_capacity(self.len);

        assert_eq!(
            self.len == 0,
            self.root.is_none(),
            "length disagrees with root presence"
        );

        if let Some(root) = self.root {
            unsafe {
                assert_eq!(T::links(root).as_ref().parent(), None, "root has a parent");
                self.assert_invariants_at(root, &mut in_order);
            }
        }

        assert_eq!(in_order.len(), self.len, "node count does not match length");
        assert_eq!(in_order, self.ranks, "rank projection is not the in-order traversal");

        for (rank, pair) in self.ranks.windows(2).enumerate() {
            unsafe {
                assert!(
                    pair[0].as_ref().key() < pair[1].as_ref().key(),
                    "keys at ranks {rank} and {} are out of order",
                    rank + 1
                );
            }
        }

        for (rank, &node) in self.ranks.iter().enumerate() {
            assert_eq!(unsafe { T::links(node).as_ref().index() }, rank);
        }
    }

    #[allow(clippy::only_used_in_recursion)]
    unsafe fn assert_invariants_at(&self, node: NonNull<T>, in_order: &mut Vec<NonNull<T>>) {
        unsafe {
            let links = T::links(node).as_ref();
            let left_height = height(links.left());
            let right_height = height(links.right());

            assert_eq!(
                links.height(),
                1 + left_height.max(right_height),
                "stale height at {:?}",
                node.as_ref().key()
            );
            assert!(
                (right_height - left_height).abs() <= 1,
                "{:?} is out of balance",
                node.as_ref().key()
            );

            for dir in [Dir::Left, Dir::Right] {
                if let Some(child) = links.child(dir) {
                    // Ensure child's parent link points to this node.
                    let parent = T::links(child)
                        .as_ref()
                        .parent()
                        .expect("child parent pointer not set");
                    assert_eq!(node, parent);
                }
            }

            if let Some(left) = links.left() {
                self.assert_invariants_at(left, in_order);
            }
            in_order.push(node);
            if let Some(right) = links.right() {
                self.assert_invariants_at(right, in_order);
            }
        }
    }

    /// Returns a reference to the node corresponding to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<Pin<&T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    /// Returns `true` if the tree contains a node corresponding to `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_raw(key).is_some()
    }

    /// Returns the rank of `key`, i.e. the number of keys in the tree less than it.
    ///
    /// Returns `None` if `key` is not in the tree. This operation completes in _O(log(n))_ time.
    pub fn find<Q>(&self, key: &Q) -> Option<usize>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        Some(unsafe { T::links(ptr).as_ref().index() })
    }

    fn get_raw<Q>(&self, key: &Q) -> Link<T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut opt_cur = self.root;

        loop {
            let cur = opt_cur?;

            unsafe {
                match key.cmp(cur.as_ref().key().borrow()) {
                    Ordering::Less => opt_cur = T::links(cur).as_ref().left(),
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => opt_cur = T::links(cur).as_ref().right(),
                }
            }
        }
    }

    /// Returns the node at rank `index`, or `None` if `index` is out of bounds.
    ///
    /// This operation completes in _O(1)_ time.
    pub fn get_index(&self, index: usize) -> Option<Pin<&T>> {
        let ptr = *self.ranks.get(index)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    /// Returns the minimum element of the tree.
    pub fn first(&self) -> Option<Pin<&T>> {
        self.get_index(0)
    }

    /// Returns the maximum element of the tree.
    pub fn last(&self) -> Option<Pin<&T>> {
        self.get_index(self.len.checked_sub(1)?)
    }

    /// Returns an iterator over the elements of the tree in ascending key order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self)
    }

    unsafe fn maybe_set_parent(&mut self, opt_node: Link<T>, parent: Link<T>) {
        let Some(node) = opt_node else {
            return;
        };

        unsafe { T::links(node).as_mut().set_parent(parent) };
    }

    #[inline]
    unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        match parent {
            Some(parent) => unsafe { self.replace_child(parent, old_child, new_child) },
            None => self.root = new_child,
        }
    }

    // Replaces the child pointer of `parent` pointing at `old_child` with `new_child`.
    //
    // `new_child`'s parent pointer is not updated.
    //
    // # Safety
    //
    // The caller must ensure that the following conditions hold:
    // - `old_child` is a child node of `parent`.
    // - `new_child` is not a child node of `parent`.
    unsafe fn replace_child(
        &mut self,
        parent: NonNull<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        unsafe {
            let dir = self.which_child(parent, old_child);

            debug_assert_eq!(
                T::links(parent).as_ref().child(dir),
                Some(old_child),
                "`old_child` must be a child of `parent`"
            );
            if let Some(new_child) = new_child {
                debug_assert_ne!(
                    T::links(parent).as_ref().child(!dir),
                    Some(new_child),
                    "`new_child` must not be a child of `parent`"
                );
            }

            T::links(parent).as_mut().set_child(dir, new_child);
        }
    }

    // Rotates the subtree rooted at `down` towards `dir`, lifting its `!dir` child into its place.
    //
    // The lifted node is re-linked into the former parent of `down`, but the tree root is not
    // updated; that is left to the caller. Returns the lifted node.
    fn rotate(&mut self, down: NonNull<T>, dir: Dir) -> NonNull<T> {
        unsafe {
            let up = T::links(down)
                .as_ref()
                .child(!dir)
                .expect("rotated node must have a child to lift");

            tracing::trace!(key = ?down.as_ref().key(), ?dir, "rotating");

            // - `down` becomes the `dir` child of `up`.
            // - `across` goes from the `dir` child of `up` to the `!dir` child of `down`.
            let across = T::links(up).as_ref().child(dir);
            T::links(down).as_mut().set_child(!dir, across);
            self.maybe_set_parent(across, Some(down));

            T::links(up).as_mut().set_child(dir, Some(down));
            let parent = T::links(down).as_mut().set_parent(Some(up));
            T::links(up).as_mut().set_parent(parent);

            if let Some(parent) = parent {
                self.replace_child(parent, down, Some(up));
            }

            // `down` is now a child of `up`, so it must be updated first.
            update_height(down);
            update_height(up);

            up
        }
    }

    // Restores the height and balance invariants on the path from `node` up to the root, then
    // sets the root.
    //
    // Every node below `node` must already satisfy both invariants.
    fn rebalance(&mut self, node: NonNull<T>) {
        let mut cur = node;

        loop {
            unsafe {
                update_height(cur);

                let balance = balance_factor(cur);
                let heavy = if balance < -1 {
                    Some(Dir::Left)
                } else if balance > 1 {
                    Some(Dir::Right)
                } else {
                    None
                };

                if let Some(heavy) = heavy {
                    let child = T::links(cur)
                        .as_ref()
                        .child(heavy)
                        .expect("heavy side must not be empty");
                    let outer = height(T::links(child).as_ref().child(heavy));
                    let inner = height(T::links(child).as_ref().child(!heavy));

                    // A zig-zag is straightened out first so that the single rotation at `cur`
                    // lifts the taller grandchild.
                    if outer < inner {
                        self.rotate(child, heavy);
                    }

                    cur = self.rotate(cur, !heavy);
                }

                match T::links(cur).as_ref().parent() {
                    Some(parent) => cur = parent,
                    None => {
                        self.root = Some(cur);
                        return;
                    }
                }
            }
        }
    }

    /// Inserts an item into the tree.
    ///
    /// If the tree already holds a node with an equal key, the tree is left unchanged and `item` is
    /// handed back.
    ///
    /// The search and rebalancing complete in _O(log(n))_ time; the rank projection rebuild in
    /// _O(n)_.
    pub fn insert(&mut self, item: T::Handle) -> Option<T::Handle> {
        let ptr = T::into_ptr(item);

        unsafe { T::links(ptr).as_mut().reset() };

        let Some(root) = self.root else {
            // Tree is empty. Set `item` as the root.
            self.root = Some(ptr);
            self.len += 1;
            self.rebuild_ranks();
            return None;
        };

        let mut parent = root;

        // Descend the tree, looking for a suitable leaf.
        loop {
            let ordering = unsafe { ptr.as_ref().key().cmp(parent.as_ref().key()) };

            let dir = match ordering {
                Ordering::Less => Dir::Left,
                Ordering::Equal => unsafe {
                    tracing::trace!(key = ?ptr.as_ref().key(), "key already present");
                    return Some(T::from_ptr(ptr));
                },
                Ordering::Greater => Dir::Right,
            };

            unsafe {
                let parent_links = T::links(parent).as_mut();
                match parent_links.child(dir) {
                    // Descend.
                    Some(child) => parent = child,

                    // Set `item` as child.
                    None => {
                        parent_links.set_child(dir, Some(ptr));
                        T::links(ptr).as_mut().set_parent(Some(parent));
                        break;
                    }
                }
            }
        }

        self.len += 1;
        self.rebalance(parent);
        self.rebuild_ranks();

        None
    }

    /// Removes the node corresponding to `key` from the tree and returns it.
    ///
    /// The search and rebalancing complete in _O(log(n))_ time; the rank projection rebuild in
    /// _O(n)_.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<T::Handle>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        // A single descent finds both the node to remove and the node that replaces it. Once the
        // target is seen, the walk goes right and then left all the way down, so the terminal
        // node is the target's successor, or the target itself if it has no right subtree.
        // Either way the terminal node has at most one child and can be spliced out directly.
        let root = self.root?;

        let mut parent = root;
        let mut node = root;
        let mut opt_next = Some(root);
        let mut target = None;

        while let Some(next) = opt_next {
            parent = node;
            node = next;

            unsafe {
                let ordering = key.cmp(node.as_ref().key().borrow());
                opt_next = match ordering {
                    Ordering::Less => T::links(node).as_ref().left(),
                    Ordering::Equal | Ordering::Greater => T::links(node).as_ref().right(),
                };

                if ordering == Ordering::Equal {
                    target = Some(node);
                }
            }
        }

        let target = target?;

        unsafe {
            let links = T::links(node).as_ref();
            let child = links.left().or(links.right());

            if node == root {
                // Only reachable when the root is the target and has no right subtree. Its one
                // child, if any, is a leaf, so the new root needs no rebalancing.
                debug_assert_eq!(node, target);
                self.root = child;
                self.maybe_set_parent(child, None);
            } else {
                tracing::trace!(key = ?node.as_ref().key(), "splicing out terminal node");

                self.replace_child(parent, node, child);
                self.maybe_set_parent(child, Some(parent));

                let mut rebalance_from = parent;

                if node != target {
                    self.transplant(target, node);

                    if rebalance_from == target {
                        rebalance_from = node;
                    }
                }

                self.rebalance(rebalance_from);
            }

            self.len -= 1;
            self.rebuild_ranks();

            T::links(target).as_mut().reset();
            Some(T::from_ptr(target))
        }
    }

    // Puts `replacement` in the position of `old`, taking over its parent, children and height.
    //
    // `replacement` must already be unlinked from the tree.
    unsafe fn transplant(&mut self, old: NonNull<T>, replacement: NonNull<T>) {
        unsafe {
            let old_links = T::links(old).as_ref();
            let parent = old_links.parent();
            let left = old_links.left();
            let right = old_links.right();
            let height = old_links.height();

            let links = T::links(replacement).as_mut();
            links.set_parent(parent);
            links.set_left(left);
            links.set_right(right);
            links.set_height(height);

            self.maybe_set_parent(left, Some(replacement));
            self.maybe_set_parent(right, Some(replacement));
            self.replace_child_or_set_root(parent, old, Some(replacement));
        }
    }

    // Rebuilds the rank projection by an in-order traversal, stamping every node with its rank.
    fn rebuild_ranks(&mut self) {
        let count = self.root.map_or(0, |root| unsafe { subtree_len(root) });
        debug_assert_eq!(count, self.len, "node count does not match length");

        let mut ranks = Vec::with_capacity(count);
        if let Some(root) = self.root {
            unsafe { project(root, &mut ranks) };
        }

        tracing::trace!(len = ranks.len(), "rebuilt rank projection");
        self.ranks = ranks;
    }

    /// Clears the tree, removing all elements.
    pub fn clear(&mut self) {
        // The projection would dangle while nodes are dropped below.
        self.ranks.clear();

        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node.
                let (cur, parent) = self.min_in_subtree(cur);
                let parent = parent.or_else(|| T::links(cur).as_ref().parent());

                let right = T::links(cur).as_ref().right();

                // Elevate the node's right child (which may be None).
                self.replace_child_or_set_root(parent, cur, right);
                self.maybe_set_parent(right, parent);

                // Drop the node.
                drop(T::from_ptr(cur));
                self.len -= 1;

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(parent);
            }
        }

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len(), 0);
    }

    // Returns the minimum node in the subtree.
    //
    // If the subtree root is not the minimum, also returns the minimum node's parent.
    #[inline]
    unsafe fn min_in_subtree(&self, root: NonNull<T>) -> (NonNull<T>, Option<NonNull<T>>) {
        let mut parent = None;
        let mut cur = root;

        while let Some(left) = unsafe { T::links(cur).as_ref().left() } {
            parent = Some(cur);
            cur = left;
        }

        (cur, parent)
    }

    unsafe fn which_child(&self, parent: NonNull<T>, child: NonNull<T>) -> Dir {
        if unsafe { T::links(parent).as_ref().left() } == Some(child) {
            Dir::Left
        } else {
            Dir::Right
        }
    }
}

/// Returns the height of the pointed-to node, or -1 for a missing node.
unsafe fn height<T>(node: Link<T>) -> i8
where
    T: TreeNode<Links<T>> + ?Sized,
{
    node.map(|n| unsafe { T::links(n).as_ref().height() })
        .unwrap_or(-1)
}

unsafe fn update_height<T>(node: NonNull<T>) -> i8
where
    T: TreeNode<Links<T>> + ?Sized,
{
    unsafe {
        let links = T::links(node).as_mut();
        let h = 1 + height(links.left()).max(height(links.right()));
        links.set_height(h);
        h
    }
}

unsafe fn balance_factor<T>(node: NonNull<T>) -> i8
where
    T: TreeNode<Links<T>> + ?Sized,
{
    unsafe {
        let links = T::links(node).as_ref();
        height(links.right()) - height(links.left())
    }
}

unsafe fn subtree_len<T>(node: NonNull<T>) -> usize
where
    T: TreeNode<Links<T>> + ?Sized,
{
    unsafe {
        let links = T::links(node).as_ref();
        let left = links.left().map_or(0, |l| subtree_len(l));
        let right = links.right().map_or(0, |r| subtree_len(r));
        1 + left + right
    }
}

unsafe fn project<T>(node: NonNull<T>, ranks: &mut Vec<NonNull<T>>)
where
    T: TreeNode<Links<T>> + ?Sized,
{
    unsafe {
        if let Some(left) = T::links(node).as_ref().left() {
            project(left, ranks);
        }

        T::links(node).as_mut().set_index(ranks.len());
        ranks.push(node);

        if let Some(right) = T::links(node).as_ref().right() {
            project(right, ranks);
        }
    }
}

impl<T> Default for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<usize> for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    type Output = T;

    /// Returns the node at rank `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    fn index(&self, index: usize) -> &T {
        unsafe { self.ranks[index].as_ref() }
    }
}

impl<T> fmt::Debug for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|node| node.key()))
            .finish()
    }
}

impl<T> Drop for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: ?Sized> Links<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                height: 0,
                index: 0,
                _unpin: PhantomPinned,
            }),
        }
    }

    // Detaches the links of a node entering or leaving a tree.
    #[inline]
    fn reset(&mut self) {
        let inner = self.inner.get_mut();
        inner.parent = None;
        inner.children = [None; 2];
        inner.height = 0;
        inner.index = 0;
    }

    #[inline]
    fn height(&self) -> i8 {
        unsafe { (*self.inner.get()).height }
    }

    #[inline]
    fn index(&self) -> usize {
        unsafe { (*self.inner.get()).index }
    }

    #[inline]
    fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    fn left(&self) -> Link<T> {
        self.child(Dir::Left)
    }

    #[inline]
    fn right(&self) -> Link<T> {
        self.child(Dir::Right)
    }

    #[inline]
    fn set_parent(&mut self, parent: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    fn set_child(&mut self, dir: Dir, child: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    #[inline]
    fn set_left(&mut self, left: Link<T>) -> Link<T> {
        self.set_child(Dir::Left, left)
    }

    #[inline]
    fn set_right(&mut self, right: Link<T>) -> Link<T> {
        self.set_child(Dir::Right, right)
    }

    #[inline]
    fn set_height(&mut self, height: i8) {
        self.inner.get_mut().height = height;
    }

    #[inline]
    fn set_index(&mut self, index: usize) {
        self.inner.get_mut().index = index;
    }
}

impl<T: ?Sized> Default for Links<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("parent", &self.parent())
            .field("left", &self.left())
            .field("right", &self.right())
            .field("height", &self.height())
            .field("index", &self.index())
            .finish()
    }
}
