//! Read-only traversals.
//!
//! Every iterator borrows the tree immutably, so the tree cannot be
//! restructured while a traversal is alive. Each call to
//! [`SaniTree::traverse`] starts a fresh walk from the root.

use std::collections::VecDeque;

use tracing::instrument;

use crate::domain::arena::{NodeId, SaniTree, TreeNode};

/// Visiting order of a traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    /// Parent before children, children left to right.
    #[default]
    PreOrder,
    /// Children (left to right) before parent.
    PostOrder,
    /// Level by level, left to right.
    BreadthFirst,
}

impl<T> SaniTree<T> {
    /// Pre-order iterator.
    pub fn iter(&self) -> PreOrderIterator<'_, T> {
        PreOrderIterator::new(self)
    }

    pub fn iter_postorder(&self) -> PostOrderIterator<'_, T> {
        PostOrderIterator::new(self)
    }

    pub fn iter_breadth_first(&self) -> BreadthFirstIterator<'_, T> {
        BreadthFirstIterator::new(self)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn traverse(&self, order: Order) -> Traverse<'_, T> {
        match order {
            Order::PreOrder => Traverse::PreOrder(self.iter()),
            Order::PostOrder => Traverse::PostOrder(self.iter_postorder()),
            Order::BreadthFirst => Traverse::BreadthFirst(self.iter_breadth_first()),
        }
    }
}

pub struct PreOrderIterator<'a, T> {
    tree: &'a SaniTree<T>,
    stack: Vec<NodeId>,
}

impl<'a, T> PreOrderIterator<'a, T> {
    fn new(tree: &'a SaniTree<T>) -> Self {
        Self {
            tree,
            stack: vec![tree.root()],
        }
    }
}

impl<'a, T> Iterator for PreOrderIterator<'a, T> {
    type Item = (NodeId, &'a TreeNode<T>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Ok(node) = self.tree.get(current) {
                // Push children in reverse order for left-to-right traversal
                self.stack.extend(node.children().iter().rev().copied());
                return Some((current, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a, T> {
    tree: &'a SaniTree<T>,
    stack: Vec<(NodeId, bool)>,
}

impl<'a, T> PostOrderIterator<'a, T> {
    fn new(tree: &'a SaniTree<T>) -> Self {
        Self {
            tree,
            stack: vec![(tree.root(), false)],
        }
    }
}

impl<'a, T> Iterator for PostOrderIterator<'a, T> {
    type Item = (NodeId, &'a TreeNode<T>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, expanded)) = self.stack.pop() {
            if let Ok(node) = self.tree.get(current) {
                if expanded {
                    return Some((current, node));
                }
                self.stack.push((current, true));
                self.stack
                    .extend(node.children().iter().rev().map(|&child| (child, false)));
            }
        }
        None
    }
}

pub struct BreadthFirstIterator<'a, T> {
    tree: &'a SaniTree<T>,
    queue: VecDeque<NodeId>,
}

impl<'a, T> BreadthFirstIterator<'a, T> {
    fn new(tree: &'a SaniTree<T>) -> Self {
        Self {
            tree,
            queue: VecDeque::from([tree.root()]),
        }
    }
}

impl<'a, T> Iterator for BreadthFirstIterator<'a, T> {
    type Item = (NodeId, &'a TreeNode<T>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.queue.pop_front() {
            if let Ok(node) = self.tree.get(current) {
                self.queue.extend(node.children().iter().copied());
                return Some((current, node));
            }
        }
        None
    }
}

/// Iterator returned by [`SaniTree::traverse`].
pub enum Traverse<'a, T> {
    PreOrder(PreOrderIterator<'a, T>),
    PostOrder(PostOrderIterator<'a, T>),
    BreadthFirst(BreadthFirstIterator<'a, T>),
}

impl<'a, T> Iterator for Traverse<'a, T> {
    type Item = (NodeId, &'a TreeNode<T>);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Traverse::PreOrder(it) => it.next(),
            Traverse::PostOrder(it) => it.next(),
            Traverse::BreadthFirst(it) => it.next(),
        }
    }
}
