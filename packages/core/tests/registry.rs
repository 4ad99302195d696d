//! The bounded LRU registry of page trees.

use lively_core::prelude::*;
use lively_core::HtmlComponent;

fn tree() -> Tree {
    Tree::new(HtmlComponent::inner("div").unwrap()).unwrap()
}

#[tokio::test]
async fn registered_trees_resolve_by_root_uid() {
    let registry = Registry::default();
    let (root_uid, shared) = registry.register(tree());

    let fetched = registry.get(&root_uid).expect("tree should be registered");
    assert!(std::sync::Arc::ptr_eq(&fetched, &shared));

    let guard = fetched.lock().await;
    assert_eq!(guard.uid_of(guard.root()), Some(root_uid.as_str()));
}

#[test]
fn lookups_of_unknown_roots_miss_quietly() {
    let registry = Registry::default();
    assert!(registry.get("nope").is_none());
}

#[test]
fn capacity_bounds_trigger_eviction() {
    let registry = Registry::new(2);
    let (first, _) = registry.register(tree());
    let (second, _) = registry.register(tree());
    let (third, _) = registry.register(tree());

    assert_eq!(registry.len(), 2);
    // Oldest entry went first; the protocol tolerates the miss
    assert!(registry.get(&first).is_none());
    assert!(registry.get(&second).is_some());
    assert!(registry.get(&third).is_some());
}

#[test]
fn gets_refresh_recency() {
    let registry = Registry::new(2);
    let (first, _) = registry.register(tree());
    let (second, _) = registry.register(tree());

    // Touch the older entry, then overflow: the untouched one is evicted
    registry.get(&first);
    let (third, _) = registry.register(tree());

    assert!(registry.get(&first).is_some());
    assert!(registry.get(&second).is_none());
    assert!(registry.get(&third).is_some());
}

#[test]
fn user_chosen_root_uids_register_as_is() {
    let registry = Registry::default();
    let mut t = tree();
    t.set_root_uid("checkout-page").unwrap();
    let (root_uid, _) = registry.register(t);
    assert_eq!(root_uid, "checkout-page");
    assert!(registry.contains("checkout-page"));
}
