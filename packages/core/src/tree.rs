//! The component arena: ownership, parent/child invariants and the
//! instrumented mutation paths.
//!
//! A [`Tree`] owns every component of one page in a slab and hands out
//! [`ComponentId`] handles. Parent and root references are plain indices, so
//! the back-edges of the component graph never need reference counting and
//! can never dangle past their tree.

use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;
use slab::Slab;

use crate::component::{Behavior, HtmlComponent};
use crate::error::{BindingError, ComponentError};
use crate::events::{
    is_known_document_event, is_known_event, BindOptions, EventBinding, EventHandler,
};
use crate::mutation::{Mutation, MutationCode};
use crate::props::StoreChange;

static NEXT_ROOT_UID: AtomicU64 = AtomicU64::new(1);

/// Handle to a component inside its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub usize);

/// An arena of components forming one rooted tree (plus any detached
/// subtrees that have not been mounted yet).
pub struct Tree {
    nodes: Slab<HtmlComponent>,
    root: ComponentId,
    uid_index: FxHashMap<String, ComponentId>,
    lively_enabled: bool,
}

impl Tree {
    /// Build a tree around `root`, running its `on_create` hook.
    pub fn new(root: HtmlComponent) -> Result<Self, ComponentError> {
        let mut tree = Self::new_deferred(root)?;
        tree.load_root()?;
        Ok(tree)
    }

    /// Build a tree around `root` without running `on_create`. Deferred roots
    /// must be loaded with [`Tree::load_root`] before rendering.
    pub fn new_deferred(root: HtmlComponent) -> Result<Self, ComponentError> {
        let mut nodes = Slab::new();
        let root = ComponentId(nodes.insert(root));
        Ok(Self {
            nodes,
            root,
            uid_index: FxHashMap::default(),
            lively_enabled: true,
        })
    }

    /// Run the deferred root's `on_create` hook. Errors when already loaded.
    pub fn load_root(&mut self) -> Result<(), ComponentError> {
        let root = self.root;
        if self.node(root)?.loaded {
            return Err(ComponentError::AlreadyLoaded);
        }
        self.node_mut(root)?.loaded = true;
        self.fire_on_create(root)
    }

    pub fn is_loaded(&self) -> bool {
        self.nodes
            .get(self.root.0)
            .map(|n| n.loaded)
            .unwrap_or(false)
    }

    /// The designated root component of this tree.
    pub fn root(&self) -> ComponentId {
        self.root
    }

    /// Whether runtime `data-*` props are injected at render time.
    pub fn lively_enabled(&self) -> bool {
        self.lively_enabled
    }

    pub fn set_lively_enabled(&mut self, enabled: bool) {
        self.lively_enabled = enabled;
    }

    /// Insert a detached component, running its `on_create` hook. Mount it
    /// with [`Tree::append_child`].
    pub fn create(&mut self, component: HtmlComponent) -> Result<ComponentId, ComponentError> {
        let id = ComponentId(self.nodes.insert(component));
        self.nodes[id.0].loaded = true;
        self.fire_on_create(id)?;
        Ok(id)
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.nodes.contains(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: ComponentId) -> Result<&HtmlComponent, ComponentError> {
        self.node(id)
    }

    pub(crate) fn node(&self, id: ComponentId) -> Result<&HtmlComponent, ComponentError> {
        self.nodes.get(id.0).ok_or(ComponentError::UnknownId(id))
    }

    pub(crate) fn node_mut(
        &mut self,
        id: ComponentId,
    ) -> Result<&mut HtmlComponent, ComponentError> {
        self.nodes
            .get_mut(id.0)
            .ok_or(ComponentError::UnknownId(id))
    }

    // hierarchy ------------------------------------------------------------

    pub fn parent_of(&self, id: ComponentId) -> Option<ComponentId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    /// The nearest parentless ancestor; `id` itself when it has no parent.
    pub fn root_of(&self, id: ComponentId) -> ComponentId {
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            current = parent;
        }
        current
    }

    pub fn is_root(&self, id: ComponentId) -> bool {
        self.parent_of(id).is_none()
    }

    pub fn children_of(&self, id: ComponentId) -> &[ComponentId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: ComponentId) -> impl Iterator<Item = ComponentId> + '_ {
        std::iter::successors(self.parent_of(id), |&cur| self.parent_of(cur))
    }

    /// Depth-first pre-order walk of the subtree rooted at `id`.
    pub fn descendants(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            for &child in self.children_of(current).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    // children -------------------------------------------------------------

    /// Append `child` to `parent`'s children list.
    pub fn append_child(
        &mut self,
        parent: ComponentId,
        child: ComponentId,
    ) -> Result<(), ComponentError> {
        let index = self.node(parent)?.children.len();
        self.insert_child(parent, index, child)
    }

    /// Insert `child` at `index` (clamped) among `parent`'s children.
    pub fn insert_child(
        &mut self,
        parent: ComponentId,
        index: usize,
        child: ComponentId,
    ) -> Result<(), ComponentError> {
        self.check_attach(parent, child)?;
        self.ensure_mutable(parent)?;

        // Reset the child's UID so the root can assign a positional one later
        self.clear_uid(child);

        let index = index.min(self.nodes[parent.0].children.len());
        self.nodes[parent.0].children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);

        self.fire_on_parent(child, parent);
        self.apply(Mutation::structural(
            parent,
            MutationCode::InsertChild,
            parent,
        ));
        Ok(())
    }

    /// Append every id in order.
    pub fn extend_children(
        &mut self,
        parent: ComponentId,
        children: impl IntoIterator<Item = ComponentId>,
    ) -> Result<(), ComponentError> {
        for child in children {
            self.append_child(parent, child)?;
        }
        Ok(())
    }

    /// Detach `child` from `parent`. The child stays in the arena and can be
    /// re-mounted.
    pub fn remove_child(
        &mut self,
        parent: ComponentId,
        child: ComponentId,
    ) -> Result<(), ComponentError> {
        let position = self
            .node(parent)?
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or(ComponentError::NotAChild { parent, child })?;
        self.remove_child_at(parent, position)?;
        Ok(())
    }

    /// Detach the child at `index`, returning its id.
    pub fn remove_child_at(
        &mut self,
        parent: ComponentId,
        index: usize,
    ) -> Result<ComponentId, ComponentError> {
        self.ensure_mutable(parent)?;
        let node = self.node(parent)?;
        if index >= node.children.len() {
            return Err(ComponentError::ChildIndexOutOfBounds { parent, index });
        }
        let child = self.nodes[parent.0].children.remove(index);
        self.nodes[child.0].parent = None;
        self.clear_uid(child);
        self.apply(Mutation::structural(
            parent,
            MutationCode::DeleteChild,
            parent,
        ));
        Ok(child)
    }

    /// Detach and return the last child, if any.
    pub fn pop_child(
        &mut self,
        parent: ComponentId,
    ) -> Result<Option<ComponentId>, ComponentError> {
        let len = self.node(parent)?.children.len();
        if len == 0 {
            return Ok(None);
        }
        self.remove_child_at(parent, len - 1).map(Some)
    }

    /// Replace the child at `index` with `child`, returning the detached one.
    /// Fires the delete and insert events the way per-element removal and
    /// insertion would.
    pub fn replace_child(
        &mut self,
        parent: ComponentId,
        index: usize,
        child: ComponentId,
    ) -> Result<ComponentId, ComponentError> {
        let old = self.remove_child_at(parent, index)?;
        self.insert_child(parent, index, child)?;
        Ok(old)
    }

    /// Detach all children, one by one.
    pub fn clear_children(&mut self, parent: ComponentId) -> Result<(), ComponentError> {
        while !self.node(parent)?.children.is_empty() {
            self.remove_child_at(parent, 0)?;
        }
        Ok(())
    }

    fn check_attach(
        &self,
        parent: ComponentId,
        child: ComponentId,
    ) -> Result<(), ComponentError> {
        let parent_node = self.node(parent)?;
        if !parent_node.accept_inner_html {
            return Err(ComponentError::NoInnerHtml);
        }
        let child_node = self.node(child)?;
        if child_node.parent.is_some() {
            return Err(ComponentError::AlreadyParented(child));
        }
        if child == parent {
            return Err(ComponentError::WouldCycle(child));
        }
        // The child must not already sit above the parent
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == child {
                return Err(ComponentError::WouldCycle(child));
            }
            cursor = self.parent_of(current);
        }
        Ok(())
    }

    // stores & text --------------------------------------------------------

    pub fn set_prop(
        &mut self,
        id: ComponentId,
        key: &str,
        value: impl Into<String>,
    ) -> Result<(), ComponentError> {
        self.ensure_mutable(id)?;
        if let Some(StoreChange::Set { key, .. }) = self.node_mut(id)?.props.set(key, value)? {
            self.apply(Mutation::keyed(id, MutationCode::SetProp, key));
        }
        Ok(())
    }

    /// Remove a prop. Returns the removed value; absent keys are a no-op.
    pub fn remove_prop(
        &mut self,
        id: ComponentId,
        key: &str,
    ) -> Result<Option<String>, ComponentError> {
        self.ensure_mutable(id)?;
        match self.node_mut(id)?.props.remove(key) {
            Some((value, StoreChange::Removed { key })) => {
                self.apply(Mutation::keyed(id, MutationCode::DeleteProp, key));
                Ok(Some(value))
            }
            _ => Ok(None),
        }
    }

    /// Insert the prop only when absent; returns the value it now holds.
    pub fn set_prop_default(
        &mut self,
        id: ComponentId,
        key: &str,
        default: impl Into<String>,
    ) -> Result<String, ComponentError> {
        self.ensure_mutable(id)?;
        let (value, change) = self.node_mut(id)?.props.set_default(key, default)?;
        if let Some(StoreChange::Set { key, .. }) = change {
            self.apply(Mutation::keyed(id, MutationCode::SetProp, key));
        }
        Ok(value)
    }

    /// Set every pair through the instrumented write path.
    pub fn extend_props<K, V>(
        &mut self,
        id: ComponentId,
        props: impl IntoIterator<Item = (K, V)>,
    ) -> Result<(), ComponentError>
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        self.ensure_mutable(id)?;
        let changes = self.node_mut(id)?.props.extend(props)?;
        for change in changes {
            if let StoreChange::Set { key, .. } = change {
                self.apply(Mutation::keyed(id, MutationCode::SetProp, key));
            }
        }
        Ok(())
    }

    pub fn set_style(
        &mut self,
        id: ComponentId,
        key: &str,
        value: impl Into<String>,
    ) -> Result<(), ComponentError> {
        self.ensure_mutable(id)?;
        if let Some(StoreChange::Set { key, .. }) = self.node_mut(id)?.style.set(key, value)? {
            self.apply(Mutation::keyed(id, MutationCode::SetStyle, key));
        }
        Ok(())
    }

    pub fn remove_style(
        &mut self,
        id: ComponentId,
        key: &str,
    ) -> Result<Option<String>, ComponentError> {
        self.ensure_mutable(id)?;
        match self.node_mut(id)?.style.remove(key) {
            Some((value, StoreChange::Removed { key })) => {
                self.apply(Mutation::keyed(id, MutationCode::DeleteStyle, key));
                Ok(Some(value))
            }
            _ => Ok(None),
        }
    }

    pub fn extend_style<K, V>(
        &mut self,
        id: ComponentId,
        style: impl IntoIterator<Item = (K, V)>,
    ) -> Result<(), ComponentError>
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        self.ensure_mutable(id)?;
        let changes = self.node_mut(id)?.style.extend(style)?;
        for change in changes {
            if let StoreChange::Set { key, .. } = change {
                self.apply(Mutation::keyed(id, MutationCode::SetStyle, key));
            }
        }
        Ok(())
    }

    /// Set the inner text. Errors on leaf components; equal text is a no-op.
    pub fn set_inner_text(
        &mut self,
        id: ComponentId,
        text: impl Into<String>,
    ) -> Result<(), ComponentError> {
        self.ensure_mutable(id)?;
        let node = self.node_mut(id)?;
        if !node.accept_inner_html {
            return Err(ComponentError::NoInnerHtml);
        }
        let text = text.into();
        if node.inner_text == text {
            return Ok(());
        }
        node.inner_text = text;
        self.apply(Mutation::new(id, MutationCode::SetInnerHtml));
        Ok(())
    }

    // freeze ---------------------------------------------------------------

    /// Freeze the component: any further mutation of its claimed state
    /// (props, style, children, text) errors. Bookkeeping caches stay
    /// writable.
    pub fn freeze(&mut self, id: ComponentId) -> Result<(), ComponentError> {
        let root = self.root;
        if !self.node(root)?.loaded {
            return Err(ComponentError::NotLoaded(
                "cannot freeze before the root is loaded".into(),
            ));
        }
        self.node_mut(id)?.frozen = true;
        Ok(())
    }

    /// Freeze the whole subtree rooted at `id`.
    pub fn freeze_deep(&mut self, id: ComponentId) -> Result<(), ComponentError> {
        for node in self.descendants(id) {
            self.freeze(node)?;
        }
        Ok(())
    }

    /// Effective frozen state: a component is frozen when it or any ancestor
    /// carries the frozen flag.
    pub fn is_frozen(&self, id: ComponentId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            match self.nodes.get(current.0) {
                Some(node) if node.frozen => return true,
                Some(node) => cursor = node.parent,
                None => return false,
            }
        }
        false
    }

    pub(crate) fn ensure_mutable(&self, id: ComponentId) -> Result<(), ComponentError> {
        if self.is_frozen(id) {
            return Err(ComponentError::Frozen(id));
        }
        Ok(())
    }

    // uids -----------------------------------------------------------------

    pub fn uid_of(&self, id: ComponentId) -> Option<&str> {
        self.nodes.get(id.0).and_then(|n| n.uid.as_deref())
    }

    pub fn require_uid(&self, id: ComponentId) -> Result<&str, ComponentError> {
        self.uid_of(id).ok_or(ComponentError::UidNotAssigned)
    }

    /// Set a user-chosen UID on the root component.
    pub fn set_root_uid(&mut self, uid: impl Into<String>) -> Result<(), ComponentError> {
        let root = self.root;
        let uid = uid.into();
        self.clear_uid(root);
        self.uid_index.insert(uid.clone(), root);
        self.node_mut(root)?.uid = Some(uid);
        Ok(())
    }

    /// The root UID, generated from process identity on first use when the
    /// caller never set one.
    pub fn ensure_root_uid(&mut self) -> String {
        let root = self.root;
        if let Some(uid) = &self.nodes[root.0].uid {
            return uid.clone();
        }
        let uid = NEXT_ROOT_UID.fetch_add(1, Ordering::Relaxed).to_string();
        self.uid_index.insert(uid.clone(), root);
        self.nodes[root.0].uid = Some(uid.clone());
        uid
    }

    /// Resolve a UID to a live component. Stale index entries (a node whose
    /// UID has moved on) resolve to `None`.
    pub fn lookup_uid(&self, uid: &str) -> Option<ComponentId> {
        let id = *self.uid_index.get(uid)?;
        match self.nodes.get(id.0) {
            Some(node) if node.uid.as_deref() == Some(uid) => Some(id),
            _ => None,
        }
    }

    pub(crate) fn index_uid(&mut self, uid: String, id: ComponentId) {
        self.uid_index.insert(uid, id);
    }

    fn clear_uid(&mut self, id: ComponentId) {
        if let Some(uid) = self.nodes[id.0].uid.take() {
            if self.uid_index.get(&uid) == Some(&id) {
                self.uid_index.remove(&uid);
            }
        }
    }

    // events ---------------------------------------------------------------

    /// Bind an event handler to the component.
    pub fn bind(
        &mut self,
        id: ComponentId,
        event: &str,
        handler: EventHandler,
        options: BindOptions,
    ) -> Result<(), ComponentError> {
        if !options.force_bind && !is_known_event(event) {
            return Err(BindingError::UnknownEvent(event.to_string()).into());
        }
        if self.node(id)?.bindings.contains_key(event) {
            return Err(BindingError::AlreadyBound(event.to_string()).into());
        }
        let binding = EventBinding {
            handler,
            targets: options.update_targets,
            update_self: options.update_self,
        };
        self.check_update_targets(id, &binding)?;

        let node = self.node_mut(id)?;
        node.bindings.insert(event.to_string(), binding);
        node.event_bindings_changed = true;
        Ok(())
    }

    /// Unbind an event. With `failsafe`, a missing binding is ignored.
    pub fn unbind(
        &mut self,
        id: ComponentId,
        event: &str,
        failsafe: bool,
    ) -> Result<(), ComponentError> {
        let node = self.node_mut(id)?;
        if node.bindings.shift_remove(event).is_some() {
            node.event_bindings_changed = true;
            Ok(())
        } else if failsafe {
            Ok(())
        } else {
            Err(BindingError::NotBound(event.to_string()).into())
        }
    }

    /// Look up the binding for `event`, cloned for dispatch.
    pub fn event_binding(
        &self,
        id: ComponentId,
        event: &str,
    ) -> Result<EventBinding, ComponentError> {
        self.node(id)?
            .bindings
            .get(event)
            .cloned()
            .ok_or_else(|| BindingError::NotBound(event.to_string()).into())
    }

    /// Bind a document-scoped event. Only page components carry these.
    pub fn document_bind(
        &mut self,
        id: ComponentId,
        event: &str,
        handler: EventHandler,
        options: BindOptions,
    ) -> Result<(), ComponentError> {
        if self.node(id)?.page.is_none() {
            return Err(BindingError::NotAPage.into());
        }
        if !options.force_bind && !is_known_document_event(event) {
            return Err(BindingError::UnknownEvent(event.to_string()).into());
        }
        let page = self.node(id)?.page.as_ref().expect("checked above");
        if page.document_bindings.contains_key(event) {
            return Err(BindingError::AlreadyBound(event.to_string()).into());
        }
        let binding = EventBinding {
            handler,
            targets: options.update_targets,
            update_self: options.update_self,
        };
        self.check_update_targets(id, &binding)?;

        let node = self.node_mut(id)?;
        node.page
            .as_mut()
            .expect("checked above")
            .document_bindings
            .insert(event.to_string(), binding);
        node.event_bindings_changed = true;
        Ok(())
    }

    pub fn document_unbind(
        &mut self,
        id: ComponentId,
        event: &str,
        failsafe: bool,
    ) -> Result<(), ComponentError> {
        let node = self.node_mut(id)?;
        let page = node.page.as_mut().ok_or(BindingError::NotAPage)?;
        if page.document_bindings.shift_remove(event).is_some() {
            node.event_bindings_changed = true;
            Ok(())
        } else if failsafe {
            Ok(())
        } else {
            Err(BindingError::NotBound(event.to_string()).into())
        }
    }

    pub fn document_binding(
        &self,
        id: ComponentId,
        event: &str,
    ) -> Result<EventBinding, ComponentError> {
        let page = self.node(id)?.page.as_ref().ok_or(BindingError::NotAPage)?;
        page.document_bindings
            .get(event)
            .cloned()
            .ok_or_else(|| BindingError::NotBound(event.to_string()).into())
    }

    /// Two update targets sharing an immediate parent or a root would imply
    /// redundant ancestor patches.
    fn check_update_targets(
        &self,
        component: ComponentId,
        binding: &EventBinding,
    ) -> Result<(), ComponentError> {
        let targets = binding.resolved_targets(component);
        for target in &targets {
            self.node(*target)?;
        }
        for (i, &a) in targets.iter().enumerate() {
            for &b in targets.iter().skip(i + 1) {
                let (pa, pb) = (self.parent_of(a), self.parent_of(b));
                if pa.is_some() && pa == pb {
                    return Err(
                        BindingError::RedundantUpdate(a, b, "targets share the same parent").into(),
                    );
                }
                if self.root_of(a) == self.root_of(b) {
                    return Err(
                        BindingError::RedundantUpdate(a, b, "targets share the same root").into(),
                    );
                }
            }
        }
        Ok(())
    }

    /// Enable or disable client-side validation before events are sent for
    /// this component. Disabled validation renders as `data-validate="false"`;
    /// enabled is implicit. Bookkeeping, so frozen components accept it.
    pub fn toggle_validation(
        &mut self,
        id: ComponentId,
        must_validate: bool,
    ) -> Result<(), ComponentError> {
        self.node_mut(id)?.validate_on_event = must_validate;
        Ok(())
    }

    /// Whether the component's event bindings changed since the runtime last
    /// synced `data-events` to the client.
    pub fn event_bindings_changed(&self, id: ComponentId) -> bool {
        self.nodes
            .get(id.0)
            .map(|n| n.event_bindings_changed)
            .unwrap_or(false)
    }

    /// Clear the binding-sync flag. Allowed on frozen components.
    pub fn reset_event_bindings_changed(&mut self, id: ComponentId) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.event_bindings_changed = false;
        }
    }

    /// Mutable access to a page root's navigation policy and document-event
    /// state. `None` for non-page components. Policy flags are bookkeeping,
    /// so this works on frozen pages too.
    pub fn page_state_mut(
        &mut self,
        id: ComponentId,
    ) -> Result<Option<&mut crate::component::PageState>, ComponentError> {
        Ok(self.node_mut(id)?.page.as_mut())
    }

    /// Whether `DOMContentLoaded` already ran for this page instance.
    pub fn dom_content_loaded_fired(&self, id: ComponentId) -> bool {
        self.nodes
            .get(id.0)
            .and_then(|n| n.page.as_ref())
            .map(|p| p.dom_content_loaded_fired)
            .unwrap_or(false)
    }

    /// Record that `DOMContentLoaded` ran. Allowed on frozen components.
    pub fn mark_dom_content_loaded(&mut self, id: ComponentId) {
        if let Some(page) = self.nodes.get_mut(id.0).and_then(|n| n.page.as_mut()) {
            page.dom_content_loaded_fired = true;
        }
    }

    // lifecycle hooks ------------------------------------------------------

    fn fire_on_create(&mut self, id: ComponentId) -> Result<(), ComponentError> {
        if let Some(mut behavior) = self.nodes.get_mut(id.0).and_then(|n| n.behavior.take()) {
            let result = behavior.on_create(self, id);
            if let Some(node) = self.nodes.get_mut(id.0) {
                if node.behavior.is_none() {
                    node.behavior = Some(behavior);
                }
            }
            result?;
        }
        Ok(())
    }

    fn fire_on_parent(&mut self, child: ComponentId, parent: ComponentId) {
        if let Some(mut behavior) = self.nodes.get_mut(child.0).and_then(|n| n.behavior.take()) {
            behavior.on_parent(self, child, parent);
            if let Some(node) = self.nodes.get_mut(child.0) {
                if node.behavior.is_none() {
                    node.behavior = Some(behavior);
                }
            }
        }
    }

    pub(crate) fn fire_on_root_finalized(&mut self, id: ComponentId, root: ComponentId) {
        if let Some(mut behavior) = self.nodes.get_mut(id.0).and_then(|n| n.behavior.take()) {
            behavior.on_root_finalized(self, id, root);
            if let Some(node) = self.nodes.get_mut(id.0) {
                if node.behavior.is_none() {
                    node.behavior = Some(behavior);
                }
            }
        }
    }

    /// Attach a behavior after construction. The `on_create` hook runs
    /// immediately when the node is already loaded.
    pub fn set_behavior(
        &mut self,
        id: ComponentId,
        behavior: impl Behavior + 'static,
    ) -> Result<(), ComponentError> {
        let node = self.node_mut(id)?;
        node.behavior = Some(Box::new(behavior));
        let loaded = node.loaded;
        if loaded {
            self.fire_on_create(id)?;
        }
        Ok(())
    }

    // mutation propagation -------------------------------------------------

    /// Apply a mutation: bump the target's counters and walk every ancestor
    /// up to the root. The structural counter moves only on the immediate
    /// parent of a child insert/delete.
    pub(crate) fn apply(&mut self, mutation: Mutation) {
        let mut cursor = Some(mutation.target);
        while let Some(id) = cursor {
            let Some(node) = self.nodes.get_mut(id.0) else {
                break;
            };
            node.mutation_version += 1;
            if mutation.code.is_structural() && mutation.parent == Some(id) {
                node.children_structure_version += 1;
            }
            cursor = node.parent;
        }
    }

    // runtime data props ---------------------------------------------------

    /// Bring the reserved `data-*` props in line with the component's current
    /// runtime state. Writes are silent: string caches regenerate, but no
    /// mutation cascade runs and frozen components accept them.
    pub(crate) fn sync_data_props(&mut self, id: ComponentId) -> Result<(), ComponentError> {
        const RESERVED: [&str; 4] = [
            "data-uid",
            "data-events",
            "data-document-events",
            "data-validate",
        ];

        let root = self.root_of(id);
        let enabled = self.lively_enabled
            && !self.node(id)?.lively_disabled
            && !self.node(root)?.lively_disabled;

        let mut wanted: Vec<(&str, String)> = Vec::new();
        if enabled {
            if let Some(uid) = self.node(id)?.uid.clone() {
                wanted.push(("data-uid", uid));
                let node = self.node(id)?;
                if node.has_bindings() {
                    let events: Vec<&str> = node.event_names().collect();
                    wanted.push(("data-events", events.join(",")));
                }
                if let Some(page) = node.page.as_ref() {
                    if !page.document_bindings.is_empty() {
                        let events: Vec<&str> = page.document_event_names().collect();
                        wanted.push(("data-document-events", events.join(",")));
                    }
                }
                // `data-validate="true"` is implicit; only the opt-out is sent
                if !node.validate_on_event {
                    wanted.push(("data-validate", "false".to_string()));
                }
            }
        }

        // Stale reserved keys come off through the real delete path so the
        // render caches see the change; frozen components keep their extras
        if !self.is_frozen(id) {
            for key in RESERVED {
                if self.node(id)?.props.contains_key(key)
                    && !wanted.iter().any(|(k, _)| *k == key)
                {
                    self.remove_prop(id, key)?;
                }
            }
        }

        let synced = enabled && !wanted.is_empty();
        let node = self.node_mut(id)?;
        for (key, value) in wanted {
            node.props.set_silent(key, value)?;
        }
        // data-events now reflects the current bindings in whatever output is
        // being generated, so the client is in sync again
        if synced {
            node.event_bindings_changed = false;
        }
        Ok(())
    }

    /// The component's current props with the reserved `data-*` entries
    /// brought up to date, copied out for the wire.
    pub fn props_snapshot(
        &mut self,
        id: ComponentId,
    ) -> Result<indexmap::IndexMap<String, String>, ComponentError> {
        self.sync_data_props(id)?;
        Ok(self.node(id)?.props.to_map())
    }

    // copying --------------------------------------------------------------

    /// Deep-copy the subtree rooted at `id` into a new detached component.
    /// UIDs, parents and caches reset; stores, bindings and flags carry over.
    /// Behaviors do not survive the copy (their hooks already ran).
    ///
    /// Frozen pages refuse: a page must never be handed out as a copy of a
    /// frozen instance.
    pub fn duplicate_subtree(&mut self, id: ComponentId) -> Result<ComponentId, ComponentError> {
        if self.node(id)?.page.is_some() && self.is_frozen(id) {
            return Err(ComponentError::CopyRefused(
                "frozen pages must not be copied",
            ));
        }

        let copy = self.copy_single(id)?;
        // (original child, copied parent) pairs; LIFO order, so children are
        // pushed reversed to come back out in list order
        let mut work: Vec<(ComponentId, ComponentId)> = self
            .node(id)?
            .children
            .iter()
            .rev()
            .map(|&child| (child, copy))
            .collect();

        while let Some((original, copied_parent)) = work.pop() {
            let copied = self.copy_single(original)?;
            self.nodes[copied.0].parent = Some(copied_parent);
            self.nodes[copied_parent.0].children.push(copied);
            for &child in self.node(original)?.children.clone().iter().rev() {
                work.push((child, copied));
            }
        }

        Ok(copy)
    }

    fn copy_single(&mut self, id: ComponentId) -> Result<ComponentId, ComponentError> {
        let source = self.node(id)?;
        let copy = HtmlComponent {
            element: source.element.clone(),
            accept_inner_html: source.accept_inner_html,
            inner_text: source.inner_text.clone(),
            props: source.props.clone(),
            style: source.style.clone(),
            parent: None,
            children: Vec::new(),
            uid: None,
            mutation_version: 0,
            children_structure_version: 0,
            frozen: source.frozen,
            loaded: source.loaded,
            behavior: None,
            bindings: source.bindings.clone(),
            event_bindings_changed: source.event_bindings_changed,
            on_root_finalized_called: false,
            deep_nesting_warned: source.deep_nesting_warned,
            validate_on_event: source.validate_on_event,
            add_to_registry: source.add_to_registry,
            lively_disabled: source.lively_disabled,
            page: source.page.clone(),
            caches: Default::default(),
        };
        Ok(ComponentId(self.nodes.insert(copy)))
    }
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("nodes", &self.nodes.len())
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}
