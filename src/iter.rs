use core::{iter::FusedIterator, ptr::NonNull, slice};

use crate::{AvlTree, Links, TreeNode};

/// An iterator over the elements of an [`AvlTree`] in ascending key order.
///
/// Walks the rank projection, so it never touches the tree links, and can be reversed.
pub struct Iter<'tree, T: TreeNode<Links<T>> + ?Sized> {
    ranks: slice::Iter<'tree, NonNull<T>>,
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iter<'tree, T> {
    pub(crate) fn new(tree: &'tree AvlTree<T>) -> Self {
        Iter {
            ranks: tree.ranks.iter(),
        }
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iterator for Iter<'tree, T> {
    type Item = &'tree T;

    fn next(&mut self) -> Option<Self::Item> {
        // SAFETY: every node in the projection is owned by the tree, which is borrowed for 'tree.
        self.ranks.next().map(|node| unsafe { node.as_ref() })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ranks.size_hint()
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> DoubleEndedIterator for Iter<'tree, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.ranks.next_back().map(|node| unsafe { node.as_ref() })
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> ExactSizeIterator for Iter<'tree, T> {}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> FusedIterator for Iter<'tree, T> {}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Clone for Iter<'tree, T> {
    fn clone(&self) -> Self {
        Iter {
            ranks: self.ranks.clone(),
        }
    }
}

impl<'tree, T> IntoIterator for &'tree AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    type Item = &'tree T;
    type IntoIter = Iter<'tree, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
