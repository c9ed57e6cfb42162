extern crate alloc;

use alloc::{collections::VecDeque, format, string::String};
use core::{fmt, fmt::Write as _, ptr::NonNull};

use crate::{AvlTree, Links, TreeNode};

const LEAF_SPACING: usize = 5;

/// A text rendering of an [`AvlTree`] lying on its side.
///
/// The right subtree is written above each node and the left subtree below it, one node per line,
/// indented by depth.
pub struct Sideways<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    tree: &'tree AvlTree<T>,
}

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a [`Display`](fmt::Display) value rendering the tree shape sideways.
    pub fn sideways(&self) -> Sideways<'_, T> {
        Sideways { tree: self }
    }

    /// Writes the tree shape in graphviz dot format, labelling each node with its key and height.
    pub fn dotgraph<W>(&self, name: &str, mut w: W) -> fmt::Result
    where
        W: fmt::Write,
    {
        let root = match self.root {
            Some(r) => r,
            None => return write!(w, "digraph \"graph-{name}\" {{}}"),
        };

        enum Item<T: ?Sized> {
            Node(NonNull<T>),
            Missing(u32),
        }

        let mut queue = VecDeque::new();
        queue.push_back(Item::Node(root));

        write!(
            w,
            "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{"
        )?;

        let mut missing = 0;
        let mut links = String::new();

        while !queue.is_empty() {
            let remaining = queue.len();

            write!(w, "{{rank=same; ")?;

            for _ in 0..remaining {
                let Some(item) = queue.pop_front() else {
                    break;
                };

                let node = match item {
                    Item::Node(node) => node,
                    Item::Missing(id) => {
                        write!(w, "\"graph{name}-missing{id}\" [shape=point]; ")?;
                        continue;
                    }
                };

                let node_links = unsafe { T::links(node).as_ref() };
                let id = node_links.index();
                let key = format!("{:?}", unsafe { node.as_ref().key() }).replace('"', "\\\"");
                let height = node_links.height();
                write!(w, "\"graph{name}-{id}\" [label=\"{key} (h={height})\"]; ")?;

                for child in [node_links.left(), node_links.right()] {
                    if let Some(child) = child {
                        let child_id = unsafe { T::links(child).as_ref().index() };

                        queue.push_back(Item::Node(child));
                        writeln!(links, "\"graph{name}-{id}\" -> \"graph{name}-{child_id}\";")?;
                    } else {
                        queue.push_back(Item::Missing(missing));
                        writeln!(
                            links,
                            "\"graph{name}-{id}\" -> \"graph{name}-missing{missing}\";"
                        )?;
                        missing += 1;
                    }
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&links)?;

        w.write_str(" }\n}")
    }
}

impl<T> Sideways<'_, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    unsafe fn fmt_node(
        &self,
        f: &mut fmt::Formatter<'_>,
        node: NonNull<T>,
        depth: usize,
    ) -> fmt::Result {
        unsafe {
            let links = T::links(node).as_ref();

            if let Some(right) = links.right() {
                self.fmt_node(f, right, depth + 1)?;
            }

            writeln!(
                f,
                "{:indent$}{:?}",
                "",
                node.as_ref().key(),
                indent = depth * LEAF_SPACING
            )?;

            if let Some(left) = links.left() {
                self.fmt_node(f, left, depth + 1)?;
            }
        }

        Ok(())
    }
}

impl<T> fmt::Display for Sideways<'_, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tree.root {
            Some(root) => unsafe { self.fmt_node(f, root, 0) },
            None => Ok(()),
        }
    }
}
