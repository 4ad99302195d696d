//! The bounded component registry consulted by every inbound event.
//!
//! Trees register under their root UID. The cache is LRU-bounded: eviction
//! is permitted, and the transport answers lookups of evicted roots with a
//! component-unknown response — the client recovers, reloading if configured.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::tree::Tree;

/// A tree shared between the registry and live connections. The async mutex
/// lets event dispatch hold the tree across handler awaits.
pub type SharedTree = Arc<tokio::sync::Mutex<Tree>>;

/// LRU mapping of `root_uid -> tree`, bounded at
/// [`Registry::DEFAULT_CAPACITY`] by default.
pub struct Registry {
    inner: Mutex<LruCache<String, SharedTree>>,
}

impl Registry {
    /// Default bound, sized for a very busy application.
    pub const DEFAULT_CAPACITY: usize = 100_000;

    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Wrap `tree` for sharing and register it under its root UID, which is
    /// generated if the caller never set one.
    pub fn register(&self, mut tree: Tree) -> (String, SharedTree) {
        let root_uid = tree.ensure_root_uid();
        let shared: SharedTree = Arc::new(tokio::sync::Mutex::new(tree));
        self.insert(root_uid.clone(), Arc::clone(&shared));
        (root_uid, shared)
    }

    pub fn insert(&self, root_uid: impl Into<String>, tree: SharedTree) {
        self.inner.lock().put(root_uid.into(), tree);
    }

    /// Fetch a tree, marking it recently used. `None` after eviction.
    pub fn get(&self, root_uid: &str) -> Option<SharedTree> {
        self.inner.lock().get(root_uid).cloned()
    }

    pub fn remove(&self, root_uid: &str) -> Option<SharedTree> {
        self.inner.lock().pop(root_uid)
    }

    pub fn contains(&self, root_uid: &str) -> bool {
        self.inner.lock().contains(root_uid)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
