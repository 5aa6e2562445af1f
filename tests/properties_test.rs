//! Property-based tests for the tree algebra and the engine
//!
//! Trees are generated as a list of `(parent choice, label)` pairs: node `i`
//! is attached under one of the nodes created before it.

use proptest::prelude::*;

use sani::application::{apply, KeepAll, Predicate, Scope};
use sani::domain::{NodeId, Order, SaniTree};

fn label_strategy() -> impl Strategy<Value = String> {
    prop_oneof![Just("a"), Just("b"), Just("c"), Just("ad")].prop_map(String::from)
}

fn tree_strategy() -> impl Strategy<Value = SaniTree<String>> {
    prop::collection::vec((any::<usize>(), label_strategy()), 0..40).prop_map(|nodes| {
        let mut tree = SaniTree::new("root".to_string());
        let mut ids: Vec<NodeId> = vec![tree.root()];
        for (choice, label) in nodes {
            let parent = ids[choice % ids.len()];
            let id = tree.append_child(parent, label).expect("parent exists");
            ids.push(id);
        }
        tree
    })
}

fn preorder(tree: &SaniTree<String>) -> Vec<String> {
    tree.traverse(Order::PreOrder)
        .map(|(_, node)| node.value().clone())
        .collect()
}

/// Pre-order values of nodes that have neither a `label` ancestor nor are one.
fn preorder_without(tree: &SaniTree<String>, label: &str) -> Vec<String> {
    tree.iter()
        .filter(|(id, node)| {
            node.value() != label
                && tree
                    .ancestors(*id)
                    .unwrap()
                    .iter()
                    .all(|&a| tree.value(a).unwrap() != label)
        })
        .map(|(_, node)| node.value().clone())
        .collect()
}

proptest! {
    #[test]
    fn keep_all_is_identity(tree in tree_strategy()) {
        let mut filtered = tree.clone();

        let report = apply(&mut filtered, &KeepAll, &Scope::new()).unwrap();

        prop_assert_eq!(&filtered, &tree);
        prop_assert_eq!(report.kept, tree.node_count());
    }

    #[test]
    fn drop_only_filter_is_idempotent(tree in tree_strategy()) {
        let drop_ad = Predicate::drop_if("drop-ad", |v: &String| v == "ad");
        let mut once = tree;
        apply(&mut once, &drop_ad, &Scope::new()).unwrap();
        let mut twice = once.clone();

        let report = apply(&mut twice, &drop_ad, &Scope::new()).unwrap();

        prop_assert_eq!(&twice, &once);
        prop_assert_eq!(report.dropped, 0);
    }

    #[test]
    fn dropping_preserves_order_of_survivors(tree in tree_strategy()) {
        let expected = preorder_without(&tree, "b");
        let drop_b = Predicate::drop_if("drop-b", |v: &String| v == "b");
        let mut filtered = tree;

        apply(&mut filtered, &drop_b, &Scope::new()).unwrap();

        prop_assert_eq!(preorder(&filtered), expected);
    }

    #[test]
    fn take_then_insert_at_same_position_is_identity(tree in tree_strategy(), pick in any::<usize>()) {
        let candidates: Vec<NodeId> = tree
            .iter()
            .map(|(id, _)| id)
            .filter(|&id| id != tree.root())
            .collect();
        prop_assume!(!candidates.is_empty());
        let mut edited = tree.clone();
        let id = candidates[pick % candidates.len()];
        let parent = edited.parent(id).unwrap().unwrap();
        let position = edited.path(id).unwrap().as_slice().last().copied().unwrap();

        let taken = edited.take_subtree(id).unwrap();
        edited.insert_subtree(parent, position, taken).unwrap();

        prop_assert_eq!(&edited, &tree);
        prop_assert_eq!(edited.node_count(), tree.node_count());
    }

    #[test]
    fn post_order_lists_children_before_parents(tree in tree_strategy()) {
        let order: Vec<NodeId> = tree.iter_postorder().map(|(id, _)| id).collect();
        prop_assert_eq!(order.len(), tree.node_count());
        for (index, id) in order.iter().enumerate() {
            for child in tree.children(*id).unwrap() {
                let child_index = order.iter().position(|x| x == child).unwrap();
                prop_assert!(child_index < index);
            }
        }
    }
}
