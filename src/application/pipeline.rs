//! Ordered, first-match-wins composition of filters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::application::filter::{BoxError, Context, Decision, Filter, StageError};
use crate::domain::SaniTree;

/// What a pipeline does after one of its filters returns `Replace` or `Rewrite`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplacePolicy {
    /// The replacement is final for this node; later filters do not run.
    #[default]
    ShortCircuit,
    /// The root of the replacement is offered to the filters that have not
    /// run yet for this node. Those may keep it, drop it, unwrap it or
    /// replace it again.
    Continue,
}

impl fmt::Display for ReplacePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplacePolicy::ShortCircuit => write!(f, "short-circuit"),
            ReplacePolicy::Continue => write!(f, "continue"),
        }
    }
}

impl FromStr for ReplacePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short-circuit" | "short_circuit" => Ok(ReplacePolicy::ShortCircuit),
            "continue" => Ok(ReplacePolicy::Continue),
            other => Err(format!(
                "unknown replace policy '{other}' (expected short-circuit or continue)"
            )),
        }
    }
}

/// Filters evaluated in order; the first non-`Keep` decision wins.
///
/// Every node is offered to the filters in the order they were added. When
/// all filters keep the node it is kept. Put more specific filters first.
pub struct Pipeline<T> {
    name: String,
    filters: Vec<Box<dyn Filter<T>>>,
    replace_policy: ReplacePolicy,
}

impl<T> Default for Pipeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pipeline<T> {
    pub fn new() -> Self {
        Self {
            name: "pipeline".to_string(),
            filters: Vec::new(),
            replace_policy: ReplacePolicy::default(),
        }
    }

    pub fn compose<I>(filters: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn Filter<T>>>,
    {
        Self {
            filters: filters.into_iter().collect(),
            ..Self::new()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_filter<F: Filter<T> + 'static>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn push(&mut self, filter: Box<dyn Filter<T>>) {
        self.filters.push(filter);
    }

    pub fn with_replace_policy(mut self, policy: ReplacePolicy) -> Self {
        self.replace_policy = policy;
        self
    }

    pub fn replace_policy(&self) -> ReplacePolicy {
        self.replace_policy
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Offers a replacement to the filters from `start` on.
    ///
    /// A rewritten value is seen with the node's own children, a replacement
    /// tree with its own.
    fn offer_replacement(
        &self,
        start: usize,
        mut candidate: Candidate<T>,
        ctx: &Context<'_, T>,
    ) -> Result<Decision<T>, BoxError> {
        for filter in &self.filters[start..] {
            let view = match &candidate {
                Candidate::Value(value) => ctx.with_value(value),
                Candidate::Tree(tree) => ctx.with_tree(tree),
            };
            let decision = filter.decide(&view).map_err(|e| stage_error(filter.name(), e))?;
            trace!(filter = filter.name(), decision = decision.label(), "replacement offered");
            match decision {
                Decision::Keep => {}
                Decision::Rewrite(next) => match &mut candidate {
                    Candidate::Value(value) => *value = next,
                    Candidate::Tree(tree) => *tree.root_value_mut() = next,
                },
                Decision::Replace(next) => candidate = Candidate::Tree(next),
                Decision::Unwrap => {
                    return match candidate {
                        Candidate::Value(_) => Ok(Decision::Unwrap),
                        Candidate::Tree(tree) => Ok(Decision::Splice(tree.into_children()?)),
                    };
                }
                other => return Ok(other),
            }
        }
        Ok(match candidate {
            Candidate::Value(value) => Decision::Rewrite(value),
            Candidate::Tree(tree) => Decision::Replace(tree),
        })
    }
}

/// What a replacing filter produced, while later filters still see it.
enum Candidate<T> {
    Value(T),
    Tree(SaniTree<T>),
}

fn stage_error(filter: &str, error: BoxError) -> BoxError {
    if error.is::<StageError>() {
        return error;
    }
    Box::new(StageError {
        filter: filter.to_string(),
        source: error,
    })
}

impl<T> Filter<T> for Pipeline<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn decide(&self, ctx: &Context<'_, T>) -> Result<Decision<T>, BoxError> {
        for (position, filter) in self.filters.iter().enumerate() {
            let decision = filter.decide(ctx).map_err(|e| stage_error(filter.name(), e))?;
            match decision {
                Decision::Keep => continue,
                Decision::Replace(replacement) if self.replace_policy == ReplacePolicy::Continue => {
                    trace!(filter = filter.name(), "replace, offering to remaining filters");
                    return self.offer_replacement(position + 1, Candidate::Tree(replacement), ctx);
                }
                Decision::Rewrite(value) if self.replace_policy == ReplacePolicy::Continue => {
                    trace!(filter = filter.name(), "rewrite, offering to remaining filters");
                    return self.offer_replacement(position + 1, Candidate::Value(value), ctx);
                }
                other => {
                    trace!(filter = filter.name(), decision = other.label(), "decided");
                    return Ok(other);
                }
            }
        }
        Ok(Decision::Keep)
    }
}

/// Builds a pipeline from filters in priority order.
pub fn compose<T>(filters: Vec<Box<dyn Filter<T>>>) -> Pipeline<T> {
    Pipeline::compose(filters)
}
