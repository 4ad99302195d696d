//! Deterministic UID assignment and the per-tree registry index.

use lively_core::prelude::*;
use lively_core::{EventHandler, HtmlComponent};

fn div() -> HtmlComponent {
    HtmlComponent::inner("div").unwrap()
}

fn noop_handler() -> EventHandler {
    EventHandler::sync(|_scope| Ok(Vec::new()))
}

#[test]
fn children_descend_from_the_base_path() {
    let mut tree = Tree::new(div()).unwrap();
    let root = tree.root();
    let a = tree.create(div()).unwrap();
    let b = tree.create(div()).unwrap();
    let inner = tree.create(div()).unwrap();
    tree.extend_children(root, [a, b]).unwrap();
    tree.append_child(b, inner).unwrap();

    tree.assign_uids(false).unwrap();

    assert_eq!(tree.uid_of(a), Some("0.0"));
    assert_eq!(tree.uid_of(b), Some("0.1"));
    assert_eq!(tree.uid_of(inner), Some("0.1.0"));
}

#[test]
fn a_user_set_root_uid_does_not_cascade_into_child_uids() {
    let mut tree = Tree::new(div()).unwrap();
    let root = tree.root();
    let child = tree.create(div()).unwrap();
    tree.append_child(root, child).unwrap();

    tree.set_root_uid("landing-page").unwrap();
    tree.assign_uids(false).unwrap();

    assert_eq!(tree.uid_of(root), Some("landing-page"));
    assert_eq!(tree.uid_of(child), Some("0.0"));
}

#[test]
fn uids_are_unique_and_resolvable() {
    let mut tree = Tree::new(div()).unwrap();
    let root = tree.root();
    for _ in 0..4 {
        let child = tree.create(div()).unwrap();
        tree.append_child(root, child).unwrap();
    }
    tree.assign_uids(false).unwrap();

    let mut seen = std::collections::HashSet::new();
    for id in tree.descendants(root) {
        let uid = tree.uid_of(id).unwrap().to_string();
        assert!(seen.insert(uid.clone()), "duplicate uid {uid}");
        assert_eq!(tree.lookup_uid(&uid), Some(id));
    }
}

#[test]
fn rerunning_without_structural_change_is_a_noop() {
    let mut tree = Tree::new(div()).unwrap();
    let root = tree.root();
    let child = tree.create(div()).unwrap();
    tree.append_child(root, child).unwrap();
    tree.assign_uids(false).unwrap();

    // Prop writes are not structural, so the short-circuit holds
    tree.set_prop(child, "id", "x").unwrap();
    tree.assign_uids(false).unwrap();
    assert_eq!(tree.uid_of(child), Some("0.0"));
}

#[test]
fn structural_changes_reassign_positional_uids() {
    let mut tree = Tree::new(div()).unwrap();
    let root = tree.root();
    let a = tree.create(div()).unwrap();
    let b = tree.create(div()).unwrap();
    tree.extend_children(root, [a, b]).unwrap();
    tree.assign_uids(false).unwrap();
    assert_eq!(tree.uid_of(b), Some("0.1"));

    tree.remove_child(root, a).unwrap();
    tree.assign_uids(false).unwrap();
    assert_eq!(tree.uid_of(b), Some("0.0"));
}

#[test]
fn force_assignment_covers_late_mounts() {
    let mut tree = Tree::new(div()).unwrap();
    let root = tree.root();
    tree.assign_uids(false).unwrap();

    let late = tree.create(div()).unwrap();
    tree.append_child(root, late).unwrap();
    assert_eq!(tree.uid_of(late), None);

    tree.assign_uids(true).unwrap();
    assert_eq!(tree.uid_of(late), Some("0.0"));
}

#[test]
fn stale_index_entries_resolve_to_none() {
    let mut tree = Tree::new(div()).unwrap();
    let root = tree.root();
    let child = tree.create(div()).unwrap();
    tree.append_child(root, child).unwrap();
    tree.assign_uids(false).unwrap();

    tree.remove_child(root, child).unwrap();
    assert_eq!(tree.lookup_uid("0.0"), None);
}

#[test]
fn on_root_finalized_fires_exactly_once() {
    struct CountFinalized;

    impl Behavior for CountFinalized {
        fn on_root_finalized(&mut self, tree: &mut Tree, id: ComponentId, _root: ComponentId) {
            let count = tree
                .get(id)
                .unwrap()
                .props()
                .get("data-finalized")
                .map(|v| v.parse::<u32>().unwrap())
                .unwrap_or(0);
            tree.set_prop(id, "data-finalized", (count + 1).to_string())
                .unwrap();
        }
    }

    let mut tree = Tree::new(div()).unwrap();
    let root = tree.root();
    let child = tree.create(div().with_behavior(CountFinalized)).unwrap();
    tree.append_child(root, child).unwrap();

    tree.assign_uids(false).unwrap();
    tree.assign_uids(true).unwrap();

    assert_eq!(
        tree.get(child).unwrap().props().get("data-finalized"),
        Some("1")
    );
}

#[test]
fn deeply_nested_bound_components_warn_once() {
    let mut tree = Tree::new(div()).unwrap();
    let mut parent = tree.root();
    // The tenth level is the first whose uid crosses the nesting limit
    for _ in 0..10 {
        let child = tree.create(div()).unwrap();
        tree.append_child(parent, child).unwrap();
        parent = child;
    }
    tree.bind(parent, "click", noop_handler(), BindOptions::new())
        .unwrap();

    tree.assign_uids(false).unwrap();
    assert!(tree.get(parent).unwrap().deep_nesting_warned());

    // A ninth-level component stays quiet
    let mut tree = Tree::new(div()).unwrap();
    let mut parent = tree.root();
    for _ in 0..9 {
        let child = tree.create(div()).unwrap();
        tree.append_child(parent, child).unwrap();
        parent = child;
    }
    tree.bind(parent, "click", noop_handler(), BindOptions::new())
        .unwrap();
    tree.assign_uids(false).unwrap();
    assert!(!tree.get(parent).unwrap().deep_nesting_warned());
}
