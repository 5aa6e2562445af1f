//! Domain layer: the tree model
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod error;
pub mod path;
pub mod render;
pub mod traverse;
pub mod value;

pub use arena::{NodeId, SaniTree, TreeNode};
pub use builder::TreeBuilder;
pub use error::{TreeError, TreeResult};
pub use path::NodePath;
pub use render::TreeRender;
pub use traverse::{Order, Traverse};
pub use value::{Element, Markup};
