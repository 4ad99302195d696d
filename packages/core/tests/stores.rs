//! Prop/style store contract, exercised through the tree's instrumented
//! write paths.

use lively_core::prelude::*;
use lively_core::HtmlComponent;

fn tree_with_div() -> (Tree, ComponentId) {
    let tree = Tree::new(HtmlComponent::inner("div").unwrap()).unwrap();
    let root = tree.root();
    (tree, root)
}

#[test]
fn keys_normalize_on_every_write() {
    let (mut tree, root) = tree_with_div();
    tree.set_prop(root, "  CLASS  ", "btn").unwrap();
    assert_eq!(tree.get(root).unwrap().props().get("class"), Some("btn"));
    assert_eq!(tree.get(root).unwrap().props().get("CLASS"), Some("btn"));
}

#[test]
fn setting_the_current_value_leaves_the_version_unchanged() {
    let (mut tree, root) = tree_with_div();
    tree.set_prop(root, "id", "a").unwrap();
    let version = tree.get(root).unwrap().props().version();
    let mutation = tree.get(root).unwrap().mutation_version();

    tree.set_prop(root, "id", "a").unwrap();
    assert_eq!(tree.get(root).unwrap().props().version(), version);
    assert_eq!(tree.get(root).unwrap().mutation_version(), mutation);
}

#[test]
fn every_effective_write_bumps_the_version_by_one() {
    let (mut tree, root) = tree_with_div();
    tree.set_prop(root, "id", "a").unwrap();
    tree.set_prop(root, "id", "b").unwrap();
    tree.remove_prop(root, "id").unwrap();
    assert_eq!(tree.get(root).unwrap().props().version(), 3);
}

#[test]
fn empty_keys_are_rejected() {
    let (mut tree, root) = tree_with_div();
    assert!(matches!(
        tree.set_prop(root, "   ", "x"),
        Err(ComponentError::EmptyKey)
    ));
}

#[test]
fn set_default_only_writes_when_absent() {
    let (mut tree, root) = tree_with_div();
    let value = tree.set_prop_default(root, "class", "card").unwrap();
    assert_eq!(value, "card");

    let value = tree.set_prop_default(root, "class", "other").unwrap();
    assert_eq!(value, "card");
    assert_eq!(tree.get(root).unwrap().props().version(), 1);
}

#[test]
fn set_default_matches_an_equivalent_direct_write() {
    let (mut tree_a, a) = tree_with_div();
    let (mut tree_b, b) = tree_with_div();

    tree_a.set_prop_default(a, "role", "main").unwrap();
    tree_b.set_prop(b, "role", "main").unwrap();

    assert_eq!(
        tree_a.get(a).unwrap().props().version(),
        tree_b.get(b).unwrap().props().version()
    );
    assert_eq!(
        tree_a.get(a).unwrap().mutation_version(),
        tree_b.get(b).unwrap().mutation_version()
    );
}

#[test]
fn remove_returns_the_value_and_tolerates_missing_keys() {
    let (mut tree, root) = tree_with_div();
    tree.set_prop(root, "id", "a").unwrap();
    assert_eq!(tree.remove_prop(root, "id").unwrap(), Some("a".into()));
    assert_eq!(tree.remove_prop(root, "id").unwrap(), None);
}

#[test]
fn extend_matches_a_sequence_of_direct_writes() {
    let (mut tree_a, a) = tree_with_div();
    let (mut tree_b, b) = tree_with_div();

    tree_a
        .extend_props(a, [("id", "x"), ("class", "y")])
        .unwrap();
    tree_b.set_prop(b, "id", "x").unwrap();
    tree_b.set_prop(b, "class", "y").unwrap();

    assert_eq!(
        tree_a.get(a).unwrap().props().version(),
        tree_b.get(b).unwrap().props().version()
    );
    assert_eq!(
        tree_a.get(a).unwrap().mutation_version(),
        tree_b.get(b).unwrap().mutation_version()
    );
}

#[test]
fn style_writes_track_their_own_version() {
    let (mut tree, root) = tree_with_div();
    tree.set_style(root, "color", "red").unwrap();
    tree.set_style(root, "color", "red").unwrap();
    assert_eq!(tree.get(root).unwrap().style().version(), 1);
    assert_eq!(tree.get(root).unwrap().props().version(), 0);
}

#[test]
fn stores_keep_insertion_order() {
    let (mut tree, root) = tree_with_div();
    tree.set_prop(root, "b", "2").unwrap();
    tree.set_prop(root, "a", "1").unwrap();
    tree.set_prop(root, "c", "3").unwrap();

    let keys: Vec<&str> = tree.get(root).unwrap().props().keys().collect();
    assert_eq!(keys, vec!["b", "a", "c"]);
}
