use alloc::boxed::Box;
use core::{
    borrow::Borrow, fmt, iter::FusedIterator, marker::PhantomPinned, ops::Index, ptr::NonNull,
};

use cordyceps::Linked;

use crate::{AvlTree, Iter, Links, TreeNode};

/// An ordered set of keys based on an [`AvlTree`], with O(1) access by rank.
///
/// ```
/// use ranked_avl::SearchTree;
///
/// let mut tree = SearchTree::from([5, 3, 8, 1, 4, 7, 9]);
/// assert_eq!(tree.find(&4), Some(2));
/// assert_eq!(tree[2], 4);
///
/// assert!(tree.remove(&5));
/// assert_eq!(tree.find(&7), Some(3));
/// ```
pub struct SearchTree<K: Ord + fmt::Debug> {
    tree: AvlTree<SetNode<K>>,
}

/// The node type of a [`SearchTree`].
pub struct SetNode<K> {
    links: Links<SetNode<K>>,
    pub(crate) key: K,
    _unpin: PhantomPinned,
}

unsafe impl<K> Linked<Links<SetNode<K>>> for SetNode<K> {
    type Handle = Box<Self>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        Box::leak(r).into()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<SetNode<K>>> {
        let ptr = ptr.as_ptr();
        unsafe { NonNull::new_unchecked(core::ptr::addr_of_mut!((*ptr).links)) }
    }
}

impl<K: Ord + fmt::Debug> TreeNode<Links<SetNode<K>>> for SetNode<K> {
    type Key = K;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

impl<K: Ord + fmt::Debug> SearchTree<K> {
    /// Creates a new, empty `SearchTree`.
    pub const fn new() -> Self {
        Self {
            tree: AvlTree::new(),
        }
    }

    /// Returns `true` if the tree contains no keys.
    pub const fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the number of keys in the tree.
    pub const fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns the height of the tree, or `None` if it is empty.
    pub fn height(&self) -> Option<u8> {
        self.tree.height()
    }

    /// Inserts `key` into the tree.
    ///
    /// Returns `false`, leaving the tree unchanged, if an equal key is already present.
    pub fn insert(&mut self, key: K) -> bool {
        let node = Box::new(SetNode {
            links: Links::new(),
            key,
            _unpin: PhantomPinned,
        });

        self.tree.insert(node).is_none()
    }

    /// Removes `key` from the tree.
    ///
    /// Returns `false` if `key` was not present.
    #[inline]
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.remove(key).is_some()
    }

    /// Removes `key` from the tree, returning the stored key if it was present.
    #[inline]
    pub fn take<Q>(&mut self, key: &Q) -> Option<K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.remove(key).map(|node| {
            let SetNode { key, .. } = *node;
            key
        })
    }

    /// Returns the rank of `key` (its 0-based position in ascending order), or `None` if it is
    /// not present.
    #[inline]
    pub fn find<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.find(key)
    }

    /// Returns `true` if the tree contains `key`.
    #[inline]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.contains_key(key)
    }

    /// Returns the key at rank `index`, or `None` if `index` is out of bounds.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&K> {
        self.tree.get_index(index).map(|node| &node.get_ref().key)
    }

    /// Returns the minimum key in the tree.
    #[inline]
    pub fn first(&self) -> Option<&K> {
        self.tree.first().map(|node| &node.get_ref().key)
    }

    /// Returns the maximum key in the tree.
    #[inline]
    pub fn last(&self) -> Option<&K> {
        self.tree.last().map(|node| &node.get_ref().key)
    }

    /// Returns an iterator over the keys in ascending order.
    #[inline]
    pub fn iter(&self) -> Keys<'_, K> {
        Keys {
            inner: self.tree.iter(),
        }
    }

    /// Clears the tree, removing all keys.
    #[inline]
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        self.tree.assert_invariants();
    }

    /// Returns a sideways text rendering of the tree shape.
    #[cfg(feature = "print")]
    pub fn sideways(&self) -> crate::Sideways<'_, SetNode<K>> {
        self.tree.sideways()
    }

    /// Writes the tree shape in graphviz dot format.
    #[cfg(feature = "print")]
    pub fn dotgraph<W: fmt::Write>(&self, name: &str, w: W) -> fmt::Result {
        self.tree.dotgraph(name, w)
    }
}

impl<K: Ord + fmt::Debug> Default for SearchTree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + fmt::Debug> Index<usize> for SearchTree<K> {
    type Output = K;

    /// Returns the key at rank `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    fn index(&self, index: usize) -> &K {
        &self.tree[index].key
    }
}

impl<K: Ord + fmt::Debug> fmt::Debug for SearchTree<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K: Ord + fmt::Debug> Extend<K> for SearchTree<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<K: Ord + fmt::Debug> FromIterator<K> for SearchTree<K> {
    /// Builds a tree by inserting keys in iteration order. Duplicates are skipped.
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut tree = SearchTree::new();
        tree.extend(iter);
        tree
    }
}

impl<K: Ord + fmt::Debug, const N: usize> From<[K; N]> for SearchTree<K> {
    fn from(keys: [K; N]) -> Self {
        keys.into_iter().collect()
    }
}

impl<'a, K: Ord + fmt::Debug> IntoIterator for &'a SearchTree<K> {
    type Item = &'a K;
    type IntoIter = Keys<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the keys of a [`SearchTree`] in ascending order.
pub struct Keys<'a, K: Ord + fmt::Debug> {
    inner: Iter<'a, SetNode<K>>,
}

impl<'a, K: Ord + fmt::Debug> Iterator for Keys<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|node| &node.key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Ord + fmt::Debug> DoubleEndedIterator for Keys<'_, K> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|node| &node.key)
    }
}

impl<K: Ord + fmt::Debug> ExactSizeIterator for Keys<'_, K> {}

impl<K: Ord + fmt::Debug> FusedIterator for Keys<'_, K> {}
