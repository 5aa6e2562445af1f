use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::error::{TreeError, TreeResult};
use crate::domain::path::NodePath;

static NEXT_TREE_TAG: AtomicU64 = AtomicU64::new(0);

fn next_tree_tag() -> u64 {
    NEXT_TREE_TAG.fetch_add(1, Ordering::Relaxed)
}

/// Stable handle to a node inside one [`SaniTree`].
///
/// Handles are generational: once a node is removed its handle never
/// resolves again, even if the arena slot is reused. A handle also carries
/// the tag of the tree that issued it and never resolves in another tree.
/// Clones of a tree share its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    tree: u64,
    index: Index,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.index.into_raw_parts();
        write!(f, "#{slot}@{generation}/t{}", self.tree)
    }
}

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug, Clone)]
pub struct TreeNode<T> {
    /// Payload carried by this node
    value: T,
    /// Index of parent node in the arena, None for the root and detached nodes
    parent: Option<NodeId>,
    /// Indices of child nodes in the arena, in document order
    children: Vec<NodeId>,
}

impl<T> TreeNode<T> {
    fn new(value: T, parent: Option<NodeId>) -> Self {
        Self {
            value,
            parent,
            children: Vec::new(),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arena-based tree of exclusively owned nodes.
///
/// Uses a generational arena for memory-safe node references and O(1)
/// lookups. Parent/child relations are index links, so moving a subtree
/// re-links indices and never copies values.
///
/// A tree always has a root. Nodes detached with [`SaniTree::detach`] stay
/// in the arena, outside the root's hierarchy, until re-attached or removed.
#[derive(Debug, Clone)]
pub struct SaniTree<T> {
    arena: Arena<TreeNode<T>>,
    root: NodeId,
    tag: u64,
}

impl<T> SaniTree<T> {
    pub fn new(root_value: T) -> Self {
        let tag = next_tree_tag();
        let mut arena = Arena::new();
        let root = NodeId {
            tree: tag,
            index: arena.insert(TreeNode::new(root_value, None)),
        };
        Self { arena, root, tag }
    }

    fn insert_node(&mut self, value: T, parent: Option<NodeId>) -> NodeId {
        NodeId {
            tree: self.tag,
            index: self.arena.insert(TreeNode::new(value, parent)),
        }
    }

    /// Arena index of a handle issued by this tree.
    fn index(&self, id: NodeId) -> Option<Index> {
        (id.tree == self.tag).then_some(id.index)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_value(&self) -> &T {
        &self.arena[self.root.index].value
    }

    pub fn root_value_mut(&mut self) -> &mut T {
        &mut self.arena[self.root.index].value
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index(id).is_some_and(|index| self.arena.contains(index))
    }

    /// Number of nodes held by the arena, detached subtrees included.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    pub fn get(&self, id: NodeId) -> TreeResult<&TreeNode<T>> {
        self.index(id)
            .and_then(|index| self.arena.get(index))
            .ok_or(TreeError::NotFound(id))
    }

    fn get_mut(&mut self, id: NodeId) -> TreeResult<&mut TreeNode<T>> {
        self.index(id)
            .and_then(|index| self.arena.get_mut(index))
            .ok_or(TreeError::NotFound(id))
    }

    pub fn value(&self, id: NodeId) -> TreeResult<&T> {
        self.get(id).map(TreeNode::value)
    }

    pub fn value_mut(&mut self, id: NodeId) -> TreeResult<&mut T> {
        self.get_mut(id).map(|node| &mut node.value)
    }

    pub fn parent(&self, id: NodeId) -> TreeResult<Option<NodeId>> {
        self.get(id).map(TreeNode::parent)
    }

    pub fn children(&self, id: NodeId) -> TreeResult<&[NodeId]> {
        self.get(id).map(TreeNode::children)
    }

    /// True when the node is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        match self.ancestors(id) {
            Ok(chain) => chain.first().copied().unwrap_or(id) == self.root,
            Err(_) => false,
        }
    }

    /// Returns `true` if `ancestor` is `node` itself or lies on its parent chain.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).ok().and_then(TreeNode::parent);
        }
        false
    }

    /// Parent chain of a node, ordered from the topmost ancestor down to the
    /// direct parent.
    pub fn ancestors(&self, id: NodeId) -> TreeResult<Vec<NodeId>> {
        let mut chain = Vec::new();
        let mut current = self.get(id)?.parent;
        while let Some(parent) = current {
            chain.push(parent);
            current = self.get(parent)?.parent;
        }
        chain.reverse();
        Ok(chain)
    }

    fn position_in(&self, parent: NodeId, child: NodeId) -> TreeResult<usize> {
        self.get(parent)?
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or_else(|| TreeError::violation(format!("{child} is not a child of {parent}")))
    }

    /// Child indices leading from the root to `id`.
    #[instrument(level = "trace", skip(self))]
    pub fn path(&self, id: NodeId) -> TreeResult<NodePath> {
        let mut steps = Vec::new();
        let mut current = id;
        while let Some(parent) = self.get(current)?.parent {
            steps.push(self.position_in(parent, current)?);
            current = parent;
        }
        if current != self.root {
            return Err(TreeError::violation(format!(
                "{id} is not reachable from the root"
            )));
        }
        steps.reverse();
        Ok(NodePath::from(steps))
    }

    /// Follows a path from the root.
    pub fn resolve(&self, path: &NodePath) -> TreeResult<NodeId> {
        let mut current = self.root;
        for &step in path.as_slice() {
            current = *self.get(current)?.children.get(step).ok_or_else(|| {
                TreeError::violation(format!("no node at path {path}"))
            })?;
        }
        Ok(current)
    }

    /// Number of levels below and including the root.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(self.root, 1)];
        while let Some((id, level)) = stack.pop() {
            max_depth = max_depth.max(level);
            if let Ok(node) = self.get(id) {
                stack.extend(node.children.iter().map(|&child| (child, level + 1)));
            }
        }
        max_depth
    }

    /// Values of all leaf nodes, left to right.
    #[instrument(level = "debug", skip(self))]
    pub fn leaf_values(&self) -> Vec<&T> {
        self.iter()
            .filter(|(_, node)| node.is_leaf())
            .map(|(_, node)| node.value())
            .collect()
    }

    pub fn append_child(&mut self, parent: NodeId, value: T) -> TreeResult<NodeId> {
        let position = self.get(parent)?.children.len();
        self.insert_child(parent, position, value)
    }

    pub fn insert_child(&mut self, parent: NodeId, position: usize, value: T) -> TreeResult<NodeId> {
        self.check_position(parent, position)?;
        let id = self.insert_node(value, Some(parent));
        self.get_mut(parent)?.children.insert(position, id);
        Ok(id)
    }

    /// Appends a new child to a parent known to exist.
    pub(crate) fn link_child(&mut self, parent: NodeId, value: T) -> NodeId {
        let id = self.insert_node(value, Some(parent));
        if let Ok(parent) = self.get_mut(parent) {
            parent.children.push(id);
        }
        id
    }

    fn check_position(&self, parent: NodeId, position: usize) -> TreeResult<()> {
        let len = self.get(parent)?.children.len();
        if position > len {
            return Err(TreeError::violation(format!(
                "position {position} out of range for {len} children of {parent}"
            )));
        }
        Ok(())
    }

    /// Unlinks a node from its parent, leaving it and its descendants in
    /// the arena as a detached subtree.
    ///
    /// Returns the former parent and position.
    #[instrument(level = "trace", skip(self))]
    pub fn detach(&mut self, id: NodeId) -> TreeResult<(NodeId, usize)> {
        if id == self.root {
            return Err(TreeError::RootDetach);
        }
        let parent = self
            .get(id)?
            .parent
            .ok_or_else(|| TreeError::violation(format!("{id} is already detached")))?;
        let position = self.position_in(parent, id)?;
        self.get_mut(parent)?.children.remove(position);
        self.get_mut(id)?.parent = None;
        Ok((parent, position))
    }

    /// Links a detached subtree under `parent` at `position`.
    ///
    /// Fails with `StructuralViolation` if `id` still has a parent, is the
    /// root, or if `parent` lies inside the subtree rooted at `id`.
    #[instrument(level = "trace", skip(self))]
    pub fn attach(&mut self, parent: NodeId, position: usize, id: NodeId) -> TreeResult<()> {
        if id == self.root {
            return Err(TreeError::violation("the root cannot become a child"));
        }
        if let Some(owner) = self.get(id)?.parent {
            return Err(TreeError::violation(format!(
                "{id} is already owned by {owner}"
            )));
        }
        self.check_position(parent, position)?;
        if self.is_ancestor(id, parent) {
            return Err(TreeError::violation(format!(
                "attaching {id} under {parent} would create a cycle"
            )));
        }
        self.get_mut(parent)?.children.insert(position, id);
        self.get_mut(id)?.parent = Some(parent);
        Ok(())
    }

    /// Ids of a subtree in pre-order.
    fn subtree_ids(&self, id: NodeId) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Ok(node) = self.get(current) {
                ids.push(current);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        ids
    }

    fn free(&mut self, id: NodeId) -> usize {
        let ids = self.subtree_ids(id);
        for node in &ids {
            self.arena.remove(node.index);
        }
        ids.len()
    }

    /// Removes a node and all its descendants. Returns the number of
    /// removed nodes.
    #[instrument(level = "trace", skip(self))]
    pub fn remove_subtree(&mut self, id: NodeId) -> TreeResult<usize> {
        if id == self.root {
            return Err(TreeError::RootDetach);
        }
        if self.get(id)?.parent.is_some() {
            self.detach(id)?;
        }
        Ok(self.free(id))
    }

    /// Removes a node and its descendants and hands them back as an owned tree.
    pub fn take_subtree(&mut self, id: NodeId) -> TreeResult<SaniTree<T>> {
        if id == self.root {
            return Err(TreeError::RootDetach);
        }
        if self.get(id)?.parent.is_some() {
            self.detach(id)?;
        }
        self.extract(id)
    }

    /// Removes a node issued by this tree from the arena.
    fn remove_node(&mut self, id: NodeId) -> TreeResult<TreeNode<T>> {
        self.index(id)
            .and_then(|index| self.arena.remove(index))
            .ok_or(TreeError::NotFound(id))
    }

    fn extract(&mut self, id: NodeId) -> TreeResult<SaniTree<T>> {
        let node = self.remove_node(id)?;
        let mut tree = SaniTree::new(node.value);
        let root = tree.root;
        let mut stack: Vec<(NodeId, NodeId)> =
            node.children.iter().rev().map(|&c| (c, root)).collect();

        while let Some((old, new_parent)) = stack.pop() {
            let node = self.remove_node(old)?;
            let new_id = tree.link_child(new_parent, node.value);
            stack.extend(node.children.iter().rev().map(|&c| (c, new_id)));
        }
        Ok(tree)
    }

    /// Moves every node of `subtree` into this arena as a detached subtree.
    fn adopt(&mut self, mut subtree: SaniTree<T>) -> TreeResult<NodeId> {
        let root = subtree.root;
        let node = subtree.remove_node(root)?;
        let adopted = self.insert_node(node.value, None);
        let mut stack: Vec<(NodeId, NodeId)> =
            node.children.iter().rev().map(|&c| (c, adopted)).collect();

        while let Some((old, new_parent)) = stack.pop() {
            let node = subtree.remove_node(old)?;
            let new_id = self.link_child(new_parent, node.value);
            stack.extend(node.children.iter().rev().map(|&c| (c, new_id)));
        }
        Ok(adopted)
    }

    /// Grafts an owned tree under `parent` at `position`.
    #[instrument(level = "trace", skip(self, subtree))]
    pub fn insert_subtree(
        &mut self,
        parent: NodeId,
        position: usize,
        subtree: SaniTree<T>,
    ) -> TreeResult<NodeId> {
        self.check_position(parent, position)?;
        let id = self.adopt(subtree)?;
        self.attach(parent, position, id)?;
        Ok(id)
    }

    /// Swaps a node and its descendants for `replacement`, keeping the
    /// sibling position. Returns the id of the inserted root.
    #[instrument(level = "trace", skip(self, replacement))]
    pub fn replace_subtree(&mut self, id: NodeId, replacement: SaniTree<T>) -> TreeResult<NodeId> {
        if id == self.root {
            return Err(TreeError::RootDetach);
        }
        self.get(id)?;
        let (parent, position) = self.detach(id)?;
        self.free(id);
        self.insert_subtree(parent, position, replacement)
    }

    /// Replaces the whole tree, returning the previous content.
    pub fn replace_root(&mut self, replacement: SaniTree<T>) -> SaniTree<T> {
        std::mem::replace(self, replacement)
    }

    /// Removes a node and splices its children into the parent's child
    /// list at the node's former position. Returns the number of promoted
    /// children.
    #[instrument(level = "trace", skip(self))]
    pub fn promote_children(&mut self, id: NodeId) -> TreeResult<usize> {
        if id == self.root {
            return Err(TreeError::RootDetach);
        }
        let (parent, position) = self.detach(id)?;
        let node = self.remove_node(id)?;
        for child in &node.children {
            if let Ok(child) = self.get_mut(*child) {
                child.parent = Some(parent);
            }
        }
        let promoted = node.children.len();
        let siblings = &mut self.get_mut(parent)?.children;
        let tail = siblings.split_off(position);
        siblings.extend(node.children);
        siblings.extend(tail);
        Ok(promoted)
    }

    /// Splits the tree into one owned tree per child of the root. The root
    /// value is discarded.
    pub fn into_children(mut self) -> TreeResult<Vec<SaniTree<T>>> {
        let children = self.get(self.root)?.children.clone();
        children
            .into_iter()
            .map(|child| self.take_subtree(child))
            .collect()
    }

    /// Deep copy of the subtree rooted at `id`.
    pub fn clone_subtree(&self, id: NodeId) -> TreeResult<SaniTree<T>>
    where
        T: Clone,
    {
        let node = self.get(id)?;
        let mut copy = SaniTree::new(node.value.clone());
        let root = copy.root;
        let mut stack: Vec<(NodeId, NodeId)> =
            node.children.iter().rev().map(|&c| (c, root)).collect();

        while let Some((old, new_parent)) = stack.pop() {
            let node = self.get(old)?;
            let new_id = copy.link_child(new_parent, node.value.clone());
            stack.extend(node.children.iter().rev().map(|&c| (c, new_id)));
        }
        Ok(copy)
    }
}

impl<T> From<T> for SaniTree<T> {
    fn from(root_value: T) -> Self {
        Self::new(root_value)
    }
}

/// Structural equality: same values in the same shape. Node ids and
/// detached subtrees are not compared.
impl<T: PartialEq> PartialEq for SaniTree<T> {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self.root, other.root)];
        while let Some((a, b)) = pending.pop() {
            match (self.get(a), other.get(b)) {
                (Ok(left), Ok(right))
                    if left.value == right.value && left.children.len() == right.children.len() =>
                {
                    pending.extend(left.children.iter().copied().zip(right.children.iter().copied()));
                }
                _ => return false,
            }
        }
        true
    }
}

impl<T: Eq> Eq for SaniTree<T> {}
