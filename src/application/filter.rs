//! Filter protocol: decisions, evaluation context and basic filters.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use thiserror::Error;

use crate::domain::{NodeId, NodePath, SaniTree, TreeResult};

/// Error type filters may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of offering one node to a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision<T> {
    /// Retain the node and its already-decided children.
    Keep,
    /// Remove the node and all its children.
    Drop,
    /// Substitute the node (and its children) with a new subtree.
    Replace(SaniTree<T>),
    /// Substitute the node's value in place; its children stay as they are.
    Rewrite(T),
    /// Remove the node but keep its children in its place.
    Unwrap,
    /// Substitute the node with zero or more subtrees, in order.
    ///
    /// A pipeline under `ReplacePolicy::Continue` answers with this when a
    /// later filter unwraps a replacement.
    Splice(Vec<SaniTree<T>>),
}

impl<T> Decision<T> {
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Keep => "keep",
            Decision::Drop => "drop",
            Decision::Replace(_) => "replace",
            Decision::Rewrite(_) => "rewrite",
            Decision::Unwrap => "unwrap",
            Decision::Splice(_) => "splice",
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, Decision::Keep)
    }
}

/// Caller-supplied variables visible to every filter during one `apply`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    vars: BTreeMap<String, String>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// What a filter sees of the node under evaluation.
///
/// Children have already been decided (post-order), so `children()` yields
/// the surviving children only.
pub struct Context<'a, T> {
    tree: &'a SaniTree<T>,
    node: NodeId,
    value: &'a T,
    children: &'a [NodeId],
    ancestors: &'a [&'a T],
    path: &'a NodePath,
    scope: &'a Scope,
}

impl<'a, T> Context<'a, T> {
    pub(crate) fn new(
        tree: &'a SaniTree<T>,
        node: NodeId,
        ancestors: &'a [&'a T],
        path: &'a NodePath,
        scope: &'a Scope,
    ) -> TreeResult<Self> {
        let current = tree.get(node)?;
        Ok(Self {
            tree,
            node,
            value: current.value(),
            children: current.children(),
            ancestors,
            path,
            scope,
        })
    }

    /// Same position and ancestry, but looking at the root of `tree`.
    pub(crate) fn with_tree<'b>(&'b self, tree: &'b SaniTree<T>) -> Context<'b, T> {
        let root = tree.root();
        Context {
            tree,
            node: root,
            value: tree.root_value(),
            children: tree.children(root).unwrap_or(&[]),
            ancestors: self.ancestors,
            path: self.path,
            scope: self.scope,
        }
    }

    /// Same node and children, but showing `value` in place of the stored one.
    pub(crate) fn with_value<'b>(&'b self, value: &'b T) -> Context<'b, T> {
        Context {
            tree: self.tree,
            node: self.node,
            value,
            children: self.children,
            ancestors: self.ancestors,
            path: self.path,
            scope: self.scope,
        }
    }

    pub fn value(&self) -> &'a T {
        self.value
    }

    pub fn children(&self) -> impl Iterator<Item = &'a T> + '_ {
        let tree = self.tree;
        self.children
            .iter()
            .filter_map(move |&child| tree.value(child).ok())
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Distance from the root; the root has depth 0.
    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    /// Position of the node in the tree as it was before `apply` started.
    pub fn path(&self) -> &NodePath {
        self.path
    }

    /// Ancestor values from the root down to the direct parent.
    pub fn ancestors(&self) -> &[&'a T] {
        self.ancestors
    }

    pub fn parent(&self) -> Option<&'a T> {
        self.ancestors.last().copied()
    }

    pub fn is_root(&self) -> bool {
        self.ancestors.is_empty()
    }

    pub fn has_ancestor(&self, mut pred: impl FnMut(&T) -> bool) -> bool {
        self.ancestors.iter().any(|value| pred(value))
    }

    pub fn scope(&self) -> &Scope {
        self.scope
    }

    /// Owned copy of the node and its surviving children, as a starting
    /// point for a `Replace`. Prefer `Rewrite` when only the value changes.
    pub fn subtree(&self) -> TreeResult<SaniTree<T>>
    where
        T: Clone,
    {
        let mut copy = self.tree.clone_subtree(self.node)?;
        *copy.root_value_mut() = self.value.clone();
        Ok(copy)
    }
}

/// A named decision unit applied to every node of a tree.
///
/// Filters are shared between threads when disjoint trees are filtered in
/// parallel and must not rely on call order beyond the post-order walk.
pub trait Filter<T>: Send + Sync {
    fn name(&self) -> &str;

    fn decide(&self, ctx: &Context<'_, T>) -> Result<Decision<T>, BoxError>;
}

impl<T, F: Filter<T> + ?Sized> Filter<T> for Box<F> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn decide(&self, ctx: &Context<'_, T>) -> Result<Decision<T>, BoxError> {
        (**self).decide(ctx)
    }
}

impl<T, F: Filter<T> + ?Sized> Filter<T> for &F {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn decide(&self, ctx: &Context<'_, T>) -> Result<Decision<T>, BoxError> {
        (**self).decide(ctx)
    }
}

/// Failure of one stage inside a composed filter, tagged with the stage name.
#[derive(Debug, Error)]
#[error("{filter}: {source}")]
pub struct StageError {
    pub filter: String,
    #[source]
    pub source: BoxError,
}

/// Filter backed by a closure that returns a full decision.
pub struct FnFilter<T, F> {
    name: String,
    func: F,
    _marker: PhantomData<fn(&T)>,
}

impl<T, F> FnFilter<T, F>
where
    F: Fn(&Context<'_, T>) -> Result<Decision<T>, BoxError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
            _marker: PhantomData,
        }
    }
}

impl<T, F> Filter<T> for FnFilter<T, F>
where
    F: Fn(&Context<'_, T>) -> Result<Decision<T>, BoxError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn decide(&self, ctx: &Context<'_, T>) -> Result<Decision<T>, BoxError> {
        (self.func)(ctx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Drop,
    Unwrap,
}

/// Filter backed by a boolean test on the node value.
pub struct Predicate<T, F> {
    name: String,
    verdict: Verdict,
    test: F,
    _marker: PhantomData<fn(&T)>,
}

impl<T, F> Predicate<T, F>
where
    F: Fn(&T) -> bool + Send + Sync,
{
    /// Drops every node the test matches.
    pub fn drop_if(name: impl Into<String>, test: F) -> Self {
        Self {
            name: name.into(),
            verdict: Verdict::Drop,
            test,
            _marker: PhantomData,
        }
    }

    /// Unwraps every node the test matches.
    pub fn unwrap_if(name: impl Into<String>, test: F) -> Self {
        Self {
            name: name.into(),
            verdict: Verdict::Unwrap,
            test,
            _marker: PhantomData,
        }
    }
}

impl<T, F> Filter<T> for Predicate<T, F>
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn decide(&self, ctx: &Context<'_, T>) -> Result<Decision<T>, BoxError> {
        if !(self.test)(ctx.value()) {
            return Ok(Decision::Keep);
        }
        Ok(match self.verdict {
            Verdict::Drop => Decision::Drop,
            Verdict::Unwrap => Decision::Unwrap,
        })
    }
}

/// Keeps every node.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAll;

impl<T> Filter<T> for KeepAll {
    fn name(&self) -> &str {
        "keep-all"
    }

    fn decide(&self, _ctx: &Context<'_, T>) -> Result<Decision<T>, BoxError> {
        Ok(Decision::Keep)
    }
}
