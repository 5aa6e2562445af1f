//! Application layer: filters, pipelines and the engine that applies them
//!
//! This layer drives the domain tree and knows nothing about files or the CLI.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod filter;
pub mod pipeline;

pub use catalog::FilterSpec;
pub use engine::{apply, Engine, NodeState, Report};
pub use error::{ApplicationError, ApplicationResult};
pub use filter::{BoxError, Context, Decision, Filter, FnFilter, KeepAll, Predicate, Scope, StageError};
pub use pipeline::{compose, Pipeline, ReplacePolicy};
