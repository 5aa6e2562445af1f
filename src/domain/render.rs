//! Terminal rendering of trees.

use std::fmt::Display;

use termtree::Tree;
use tracing::instrument;

use crate::domain::arena::{NodeId, SaniTree};

pub trait TreeRender {
    fn to_termtree(&self) -> Tree<String>;
}

impl<T: Display> TreeRender for SaniTree<T> {
    #[instrument(level = "debug", skip(self))]
    fn to_termtree(&self) -> Tree<String> {
        fn build<T: Display>(tree: &SaniTree<T>, id: NodeId, parent: &mut Tree<String>) {
            if let Ok(children) = tree.children(id) {
                for &child in children {
                    if let Ok(value) = tree.value(child) {
                        let mut child_tree = Tree::new(value.to_string());
                        build(tree, child, &mut child_tree);
                        parent.push(child_tree);
                    }
                }
            }
        }

        let mut rendered = Tree::new(self.root_value().to_string());
        build(self, self.root(), &mut rendered);
        rendered
    }
}
