//! Stack-based tree construction for parsers and tests.

use crate::domain::arena::{NodeId, SaniTree};
use crate::domain::error::TreeResult;

/// Builds a [`SaniTree`] in document order.
///
/// `open` descends into a new node, `close` returns to its parent, `leaf`
/// appends a childless node at the current level.
///
/// ```ignore
/// let tree = TreeBuilder::new("doc")
///     .open("div")
///     .leaf("p1")
///     .close()
///     .leaf("p2")
///     .build();
/// ```
pub struct TreeBuilder<T> {
    tree: SaniTree<T>,
    stack: Vec<NodeId>,
}

impl<T> TreeBuilder<T> {
    pub fn new(root_value: impl Into<T>) -> Self {
        let tree = SaniTree::new(root_value.into());
        let stack = vec![tree.root()];
        Self { tree, stack }
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or_else(|| self.tree.root())
    }

    pub fn leaf(mut self, value: impl Into<T>) -> Self {
        let parent = self.current();
        self.tree.link_child(parent, value.into());
        self
    }

    pub fn leaves<I>(self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<T>,
    {
        values.into_iter().fold(self, |builder, value| builder.leaf(value))
    }

    pub fn open(mut self, value: impl Into<T>) -> Self {
        let parent = self.current();
        let id = self.tree.link_child(parent, value.into());
        self.stack.push(id);
        self
    }

    /// Returns to the parent level. Closing at the root level is a no-op.
    pub fn close(mut self) -> Self {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
        self
    }

    /// Grafts a prebuilt tree as the last child at the current level.
    pub fn subtree(mut self, subtree: SaniTree<T>) -> TreeResult<Self> {
        let parent = self.current();
        let position = self.tree.children(parent)?.len();
        self.tree.insert_subtree(parent, position, subtree)?;
        Ok(self)
    }

    pub fn build(self) -> SaniTree<T> {
        self.tree
    }
}
