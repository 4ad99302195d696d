//! Deterministic UID assignment over the component tree.
//!
//! UIDs are dotted paths: a child at index `i` of a node with UID `u` gets
//! `u.i`. The root's own UID is user-set or derived from process identity,
//! but its children always descend from the base path (`"0"` by default) so
//! a root-id change does not cascade new UIDs through the tree.

use std::collections::VecDeque;

use tracing::warn;

use crate::error::ComponentError;
use crate::tree::{ComponentId, Tree};

/// Components with event bindings nested deeper than this emit a one-shot
/// diagnostic: updates get slower with every extra level of DOM traversal.
pub const MAX_EVENT_NESTING_LEVEL: usize = 9;

impl Tree {
    /// Assign UIDs to the entire tree with the default base path `"0"`.
    ///
    /// A no-op when neither the children structure nor the root UID changed
    /// since the last pass; `force` overrides the short-circuit. Callers that
    /// mount a component after the initial assignment and need an immediate
    /// UID pass `force = true`.
    pub fn assign_uids(&mut self, force: bool) -> Result<(), ComponentError> {
        self.assign_uids_with_base("0", force)
    }

    /// Assign UIDs descending from `base` for the root's children.
    pub fn assign_uids_with_base(
        &mut self,
        base: &str,
        force: bool,
    ) -> Result<(), ComponentError> {
        let root = self.root();
        if self.parent_of(root).is_some() {
            return Err(ComponentError::NotARoot);
        }

        let root_uid = self.ensure_root_uid();
        let structure_version = self.node(root)?.children_structure_version();

        if !force {
            let unchanged = self
                .node(root)?
                .caches
                .uid_assignment
                .as_ref()
                .is_some_and(|(version, uid)| {
                    *version == structure_version && *uid == root_uid
                });
            if unchanged {
                return Ok(());
            }
        }

        let mut queue: VecDeque<(ComponentId, String)> = VecDeque::new();
        queue.push_back((root, root_uid.clone()));
        let mut finalize: Vec<ComponentId> = Vec::new();

        while let Some((id, uid)) = queue.pop_front() {
            let node = self.node_mut(id)?;
            if node.uid.as_deref() != Some(uid.as_str()) {
                node.uid = Some(uid.clone());
            }

            if id != root && !node.on_root_finalized_called {
                node.on_root_finalized_called = true;
                finalize.push(id);
            }

            if node.has_bindings() && !node.deep_nesting_warned {
                let level = uid.matches('.').count();
                if level > MAX_EVENT_NESTING_LEVEL {
                    node.deep_nesting_warned = true;
                    warn!(
                        uid = %uid,
                        level,
                        "component with event bindings is nested deeper than {MAX_EVENT_NESTING_LEVEL} \
                         levels; updates to it may be slow"
                    );
                }
            }

            if self.node(id)?.add_to_registry {
                self.index_uid(uid.clone(), id);
            }

            // Children of the root descend from the base path, not from the
            // root's own UID, keeping child UIDs stable across root-id changes
            let child_base = if id == root { base.to_string() } else { uid };
            for (index, &child) in self.children_of(id).iter().enumerate() {
                queue.push_back((child, format!("{child_base}.{index}")));
            }
        }

        self.node_mut(root)?.caches.uid_assignment = Some((structure_version, root_uid));

        // Hooks run after the traversal so they can mutate the tree freely
        for id in finalize {
            self.fire_on_root_finalized(id, root);
        }
        Ok(())
    }
}
