//! Tests for the arena tree: construction, traversal and structural mutation

use rstest::rstest;

use sani::domain::{NodePath, Order, SaniTree, TreeBuilder, TreeError, TreeRender};

fn values(tree: &SaniTree<String>, order: Order) -> Vec<String> {
    tree.traverse(order)
        .map(|(_, node)| node.value().clone())
        .collect()
}

fn child_values(tree: &SaniTree<String>) -> Vec<String> {
    tree.children(tree.root())
        .unwrap()
        .iter()
        .map(|&id| tree.value(id).unwrap().clone())
        .collect()
}

/// doc
/// ├── a
/// │   ├── a1
/// │   └── a2
/// └── b
///     └── b1
fn sample() -> SaniTree<String> {
    TreeBuilder::<String>::new("doc")
        .open("a")
        .leaves(["a1", "a2"])
        .close()
        .open("b")
        .leaf("b1")
        .close()
        .build()
}

// ============================================================
// Construction and traversal
// ============================================================

#[test]
fn given_builder_when_building_then_nodes_follow_document_order() {
    let tree = sample();

    assert_eq!(tree.node_count(), 6);
    assert_eq!(tree.depth(), 3);
    assert_eq!(values(&tree, Order::PreOrder), ["doc", "a", "a1", "a2", "b", "b1"]);
}

#[test]
fn given_prebuilt_tree_when_grafted_by_builder_then_appended_at_current_level() {
    let tree = TreeBuilder::<String>::new("doc")
        .open("section")
        .leaf("intro")
        .subtree(sample())
        .unwrap()
        .close()
        .leaf("footer")
        .build();

    assert_eq!(
        values(&tree, Order::PreOrder),
        ["doc", "section", "intro", "doc", "a", "a1", "a2", "b", "b1", "footer"]
    );
}

#[rstest]
#[case(Order::PreOrder, &["doc", "a", "a1", "a2", "b", "b1"])]
#[case(Order::PostOrder, &["a1", "a2", "a", "b1", "b", "doc"])]
#[case(Order::BreadthFirst, &["doc", "a", "b", "a1", "a2", "b1"])]
fn given_tree_when_traversing_then_yields_expected_order(#[case] order: Order, #[case] expected: &[&str]) {
    assert_eq!(values(&sample(), order), expected);
}

#[test]
fn given_tree_when_collecting_leaves_then_left_to_right() {
    let tree = sample();
    let leaves: Vec<&String> = tree.leaf_values();
    assert_eq!(leaves, ["a1", "a2", "b1"]);
}

#[test]
fn given_node_when_resolving_its_path_then_returns_same_node() {
    let tree = sample();
    let a2 = tree.resolve(&NodePath::from(vec![0, 1])).unwrap();

    assert_eq!(tree.value(a2).unwrap(), "a2");
    assert_eq!(tree.path(a2).unwrap().to_string(), "/0/1");
    assert_eq!(tree.ancestors(a2).unwrap().len(), 2);
}

#[test]
fn given_position_past_end_when_inserting_child_then_structural_violation() {
    let mut tree = sample();
    let root = tree.root();

    let result = tree.insert_child(root, 5, "late".to_string());

    assert!(matches!(result, Err(TreeError::StructuralViolation { .. })));
}

// ============================================================
// Detach, attach and removal
// ============================================================

#[test]
fn given_removed_node_when_looked_up_then_not_found() {
    let mut tree = sample();
    let a = tree.resolve(&NodePath::from(vec![0])).unwrap();

    let removed = tree.remove_subtree(a).unwrap();

    assert_eq!(removed, 3);
    assert!(matches!(tree.get(a), Err(TreeError::NotFound(id)) if id == a));
    assert_eq!(child_values(&tree), ["b"]);
}

#[test]
fn given_root_when_detaching_or_removing_then_root_detach_error() {
    let mut tree = sample();
    let root = tree.root();

    assert_eq!(tree.detach(root), Err(TreeError::RootDetach));
    assert_eq!(tree.remove_subtree(root), Err(TreeError::RootDetach));
    assert_eq!(tree.node_count(), 6, "failed calls must not mutate");
}

#[test]
fn given_id_from_other_tree_when_editing_then_not_found_and_tree_unchanged() {
    // Arrange: both arenas hand out the same slots
    let mut a = TreeBuilder::<String>::new("a-root").leaf("a-child").build();
    let b = TreeBuilder::<String>::new("b-root").leaf("b-child").build();
    let b_child = b.children(b.root()).unwrap()[0];
    let a_root = a.root();

    // Act / Assert
    assert!(!a.contains(b_child));
    assert!(matches!(a.get(b_child), Err(TreeError::NotFound(id)) if id == b_child));
    assert!(matches!(a.remove_subtree(b_child), Err(TreeError::NotFound(_))));
    assert!(matches!(a.detach(b_child), Err(TreeError::NotFound(_))));
    assert!(matches!(a.promote_children(b_child), Err(TreeError::NotFound(_))));
    assert!(matches!(a.attach(a_root, 0, b_child), Err(TreeError::NotFound(_))));
    assert!(matches!(
        a.replace_subtree(b_child, SaniTree::new("x".to_string())),
        Err(TreeError::NotFound(_))
    ));
    assert!(matches!(a.value_mut(b_child), Err(TreeError::NotFound(_))));
    assert_eq!(child_values(&a), ["a-child"]);
    assert_eq!(a.node_count(), 2);
}

#[test]
fn given_clone_when_looking_up_original_ids_then_they_resolve() {
    let tree = sample();
    let a = tree.resolve(&NodePath::from(vec![0])).unwrap();

    let copy = tree.clone();

    assert_eq!(copy.value(a).unwrap(), "a");
}

#[test]
fn given_subtree_moved_between_trees_when_old_ids_used_then_not_found() {
    let mut source = sample();
    let mut target = TreeBuilder::<String>::new("target").build();
    let a = source.resolve(&NodePath::from(vec![0])).unwrap();

    let taken = source.take_subtree(a).unwrap();
    let target_root = target.root();
    let grafted = target.insert_subtree(target_root, 0, taken).unwrap();

    assert!(target.get(a).is_err());
    assert_eq!(target.value(grafted).unwrap(), "a");
    assert_eq!(target.path(grafted).unwrap(), NodePath::from(vec![0]));
}

#[test]
fn given_node_when_attaching_under_own_descendant_then_structural_violation() {
    let mut tree = sample();
    let a = tree.resolve(&NodePath::from(vec![0])).unwrap();
    let a1 = tree.resolve(&NodePath::from(vec![0, 0])).unwrap();
    tree.detach(a).unwrap();

    let result = tree.attach(a1, 0, a);

    assert!(matches!(result, Err(TreeError::StructuralViolation { .. })));
    assert!(!tree.is_attached(a));
}

#[test]
fn given_attached_node_when_attaching_again_then_structural_violation() {
    let mut tree = sample();
    let root = tree.root();
    let b1 = tree.resolve(&NodePath::from(vec![1, 0])).unwrap();

    let result = tree.attach(root, 0, b1);

    assert!(matches!(result, Err(TreeError::StructuralViolation { .. })));
}

#[test]
fn given_detached_node_when_reattached_elsewhere_then_moves_with_children() {
    let mut tree = sample();
    let a = tree.resolve(&NodePath::from(vec![0])).unwrap();
    let b = tree.resolve(&NodePath::from(vec![1])).unwrap();

    tree.detach(a).unwrap();
    tree.attach(b, 0, a).unwrap();

    assert_eq!(values(&tree, Order::PreOrder), ["doc", "b", "a", "a1", "a2", "b1"]);
    assert_eq!(tree.parent(a).unwrap(), Some(b));
}

#[test]
fn given_subtree_when_taken_and_reinserted_then_tree_is_unchanged() {
    let original = sample();
    let mut tree = original.clone();
    let a = tree.resolve(&NodePath::from(vec![0])).unwrap();

    let taken = tree.take_subtree(a).unwrap();
    assert_eq!(tree.node_count(), 3);
    let root = tree.root();
    tree.insert_subtree(root, 0, taken).unwrap();

    assert_eq!(tree, original);
}

// ============================================================
// Replace and promote
// ============================================================

#[test]
fn given_node_when_replaced_then_sibling_position_is_kept() {
    let mut tree = TreeBuilder::<String>::new("doc").leaves(["a", "b", "c"]).build();
    let b = tree.resolve(&NodePath::from(vec![1])).unwrap();
    let replacement = TreeBuilder::<String>::new("x").leaf("x1").build();

    let new_id = tree.replace_subtree(b, replacement).unwrap();

    assert_eq!(child_values(&tree), ["a", "x", "c"]);
    assert_eq!(tree.children(new_id).unwrap().len(), 1);
    assert!(!tree.contains(b));
}

#[test]
fn given_root_when_replace_root_then_old_tree_is_returned() {
    let mut tree = sample();

    let old = tree.replace_root(SaniTree::new("fresh".to_string()));

    assert_eq!(tree.root_value(), "fresh");
    assert_eq!(old, sample());
}

#[test]
fn given_node_with_grandchildren_when_promoting_children_then_spliced_in_order() {
    // doc -> [x, mid -> [c1 -> [g1], c2 -> [g2]], y]
    let mut tree = TreeBuilder::<String>::new("doc")
        .leaf("x")
        .open("mid")
        .open("c1")
        .leaf("g1")
        .close()
        .open("c2")
        .leaf("g2")
        .close()
        .close()
        .leaf("y")
        .build();
    let mid = tree.resolve(&NodePath::from(vec![1])).unwrap();

    let promoted = tree.promote_children(mid).unwrap();

    assert_eq!(promoted, 2);
    assert_eq!(child_values(&tree), ["x", "c1", "c2", "y"]);
    assert_eq!(values(&tree, Order::PreOrder), ["doc", "x", "c1", "g1", "c2", "g2", "y"]);
    let c2 = tree.resolve(&NodePath::from(vec![2])).unwrap();
    assert_eq!(tree.parent(c2).unwrap(), Some(tree.root()));
}

#[test]
fn given_root_when_promoting_children_then_root_detach_error() {
    let mut tree = sample();
    let root = tree.root();
    assert_eq!(tree.promote_children(root), Err(TreeError::RootDetach));
}

#[test]
fn given_tree_when_split_into_children_then_one_tree_per_child() {
    let parts = sample().into_children().unwrap();

    let roots: Vec<&String> = parts.iter().map(|t| t.root_value()).collect();
    assert_eq!(roots, ["a", "b"]);
    assert_eq!(parts[0].node_count(), 3);
}

// ============================================================
// Rendering
// ============================================================

#[test]
fn given_tree_when_rendered_then_contains_every_value() {
    let rendered = sample().to_termtree().to_string();

    for value in ["doc", "a", "a1", "a2", "b", "b1"] {
        assert!(rendered.contains(value), "missing {value} in:\n{rendered}");
    }
    assert!(rendered.starts_with("doc"));
}
