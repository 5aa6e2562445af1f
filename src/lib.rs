//! sani: hierarchical content sanitization.
//!
//! A [`SaniTree`] holds an arena of nodes; a [`Filter`] decides per node
//! whether to keep, drop, replace or unwrap it; [`Engine::apply`] walks the
//! tree in post-order and commits those decisions.
//!
//! Layers (inner to outer): `domain` (tree model), `application`
//! (filters, pipeline, engine), `infrastructure` (documents on disk), `cli`.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

pub use application::{
    apply, compose, ApplicationError, Context, Decision, Engine, Filter, FilterSpec, Pipeline,
    ReplacePolicy, Report, Scope,
};
pub use domain::{Element, Markup, NodeId, NodePath, SaniTree, TreeBuilder, TreeError};
