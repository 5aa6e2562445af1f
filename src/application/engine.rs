//! Post-order application of a filter to a tree.

use std::collections::HashMap;
use std::fmt;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, instrument, trace, warn};

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::filter::{BoxError, Context, Decision, Filter, Scope, StageError};
use crate::domain::{NodeId, NodePath, SaniTree, TreeError, TreeResult};

/// Counts of the decisions taken during one `apply`.
///
/// `replaced` counts every `Replace`, `Rewrite` and `Splice` decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub kept: usize,
    pub dropped: usize,
    pub replaced: usize,
    pub unwrapped: usize,
}

impl Report {
    pub fn total(&self) -> usize {
        self.kept + self.dropped + self.replaced + self.unwrapped
    }

    pub fn merge(&mut self, other: &Report) {
        self.kept += other.kept;
        self.dropped += other.dropped;
        self.replaced += other.replaced;
        self.unwrapped += other.unwrapped;
    }

    fn record(&mut self, state: NodeState) {
        match state {
            NodeState::Kept => self.kept += 1,
            NodeState::Dropped => self.dropped += 1,
            NodeState::Replaced => self.replaced += 1,
            NodeState::Unwrapped => self.unwrapped += 1,
            NodeState::Pending | NodeState::Evaluating => {}
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "kept={} dropped={} replaced={} unwrapped={}",
            self.kept, self.dropped, self.replaced, self.unwrapped
        )
    }
}

/// Lifecycle of a node within one `apply` call.
///
/// `Pending → Evaluating → {Kept, Dropped, Replaced, Unwrapped}`. Terminal
/// states are never left again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Pending,
    Evaluating,
    Kept,
    Dropped,
    Replaced,
    Unwrapped,
}

impl NodeState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, NodeState::Pending | NodeState::Evaluating)
    }
}

/// Runs filters over trees.
///
/// With `transactional` enabled (the default) a failed `apply` restores the
/// tree to its state before the call, at the price of one clone per call.
/// Without it, decisions committed before the failure stay in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Engine {
    transactional: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            transactional: true,
        }
    }

    pub fn transactional(mut self, enabled: bool) -> Self {
        self.transactional = enabled;
        self
    }

    pub fn is_transactional(&self) -> bool {
        self.transactional
    }

    /// Offers every node to `filter` in post-order and commits the decisions.
    ///
    /// The set of nodes to visit is fixed before the first decision, so
    /// subtrees inserted by `Replace` or `Splice` are never offered again in
    /// the same call.
    #[instrument(level = "debug", skip_all, fields(filter = filter.name()))]
    pub fn apply<T, F>(&self, tree: &mut SaniTree<T>, filter: &F, scope: &Scope) -> ApplicationResult<Report>
    where
        T: Clone,
        F: Filter<T> + ?Sized,
    {
        let backup = self.transactional.then(|| tree.clone());
        match run(tree, filter, scope) {
            Ok(report) => {
                debug!("apply: {report}");
                Ok(report)
            }
            Err(e) => {
                match backup {
                    Some(original) => {
                        *tree = original;
                        debug!("apply: failed, tree restored: {e}");
                    }
                    None => warn!("apply: failed without rollback, tree is partially filtered: {e}"),
                }
                Err(e)
            }
        }
    }

    /// Filters independent trees in parallel. Results are in input order.
    #[instrument(level = "debug", skip_all, fields(trees = trees.len()))]
    pub fn apply_many<T, F>(
        &self,
        trees: &mut [SaniTree<T>],
        filter: &F,
        scope: &Scope,
    ) -> Vec<ApplicationResult<Report>>
    where
        T: Clone + Send,
        F: Filter<T> + ?Sized,
    {
        trees
            .par_iter_mut()
            .map(|tree| self.apply(tree, filter, scope))
            .collect()
    }
}

/// [`Engine::apply`] with the default, transactional engine.
pub fn apply<T, F>(tree: &mut SaniTree<T>, filter: &F, scope: &Scope) -> ApplicationResult<Report>
where
    T: Clone,
    F: Filter<T> + ?Sized,
{
    Engine::default().apply(tree, filter, scope)
}

fn run<T, F>(tree: &mut SaniTree<T>, filter: &F, scope: &Scope) -> ApplicationResult<Report>
where
    F: Filter<T> + ?Sized,
{
    let schedule = post_order_schedule(tree);
    let mut states: HashMap<NodeId, NodeState> =
        schedule.iter().map(|(id, _)| (*id, NodeState::Pending)).collect();
    let mut report = Report::default();

    for (id, path) in &schedule {
        if states.get(id).is_some_and(|state| state.is_terminal()) {
            continue;
        }
        states.insert(*id, NodeState::Evaluating);

        let decision = evaluate(tree, *id, path, filter, scope)?;
        let label = decision.label();
        let state = commit(tree, *id, decision)?;
        trace!(node = %id, %path, decision = label, "committed");

        states.insert(*id, state);
        report.record(state);
    }
    Ok(report)
}

/// Post-order list of the current nodes together with their paths.
fn post_order_schedule<T>(tree: &SaniTree<T>) -> Vec<(NodeId, NodePath)> {
    let mut schedule = Vec::with_capacity(tree.node_count());
    let mut stack = vec![(tree.root(), NodePath::root(), false)];

    while let Some((id, path, expanded)) = stack.pop() {
        if expanded {
            schedule.push((id, path));
            continue;
        }
        let Ok(children) = tree.children(id) else {
            continue;
        };
        stack.push((id, path.clone(), true));
        for (index, &child) in children.iter().enumerate().rev() {
            stack.push((child, path.child(index), false));
        }
    }
    schedule
}

fn evaluate<T, F>(
    tree: &SaniTree<T>,
    id: NodeId,
    path: &NodePath,
    filter: &F,
    scope: &Scope,
) -> ApplicationResult<Decision<T>>
where
    F: Filter<T> + ?Sized,
{
    let ancestors = tree
        .ancestors(id)?
        .into_iter()
        .map(|ancestor| tree.value(ancestor))
        .collect::<TreeResult<Vec<&T>>>()?;
    let ctx = Context::new(tree, id, &ancestors, path, scope)?;
    filter
        .decide(&ctx)
        .map_err(|source| evaluation_error(filter.name(), path, source))
}

fn evaluation_error(filter: &str, path: &NodePath, source: BoxError) -> ApplicationError {
    match source.downcast::<StageError>() {
        Ok(stage) => ApplicationError::Evaluation {
            path: path.clone(),
            filter: stage.filter,
            source: stage.source,
        },
        Err(source) => ApplicationError::Evaluation {
            path: path.clone(),
            filter: filter.to_string(),
            source,
        },
    }
}

fn commit<T>(tree: &mut SaniTree<T>, id: NodeId, decision: Decision<T>) -> TreeResult<NodeState> {
    let is_root = id == tree.root();
    let state = match decision {
        Decision::Keep => NodeState::Kept,
        Decision::Drop => {
            tree.remove_subtree(id)?;
            NodeState::Dropped
        }
        Decision::Replace(replacement) if is_root => {
            tree.replace_root(replacement);
            NodeState::Replaced
        }
        Decision::Replace(replacement) => {
            tree.replace_subtree(id, replacement)?;
            NodeState::Replaced
        }
        Decision::Rewrite(value) => {
            *tree.value_mut(id)? = value;
            NodeState::Replaced
        }
        Decision::Unwrap => {
            tree.promote_children(id)?;
            NodeState::Unwrapped
        }
        Decision::Splice(parts) => {
            splice(tree, id, parts)?;
            NodeState::Replaced
        }
    };
    Ok(state)
}

fn splice<T>(tree: &mut SaniTree<T>, id: NodeId, parts: Vec<SaniTree<T>>) -> TreeResult<()> {
    if id == tree.root() {
        let mut parts = parts.into_iter();
        return match (parts.next(), parts.next()) {
            (Some(only), None) => {
                tree.replace_root(only);
                Ok(())
            }
            _ => Err(TreeError::RootDetach),
        };
    }
    let (parent, position) = tree.detach(id)?;
    tree.remove_subtree(id)?;
    for (offset, part) in parts.into_iter().enumerate() {
        tree.insert_subtree(parent, position + offset, part)?;
    }
    Ok(())
}
