//! The component node: element tag, stores, text, bindings and caches.
//!
//! Components live in a [`Tree`](crate::tree::Tree) arena and are addressed by
//! [`ComponentId`](crate::tree::ComponentId). The struct here is the concrete
//! state; subclass-style lifecycle hooks are modeled by the [`Behavior`]
//! trait, carried as a boxed trait object on the node.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::ComponentError;
use crate::events::EventBinding;
use crate::props::PropStore;
use crate::tree::{ComponentId, Tree};
use crate::vdom::VNode;

/// Longest accepted element tag, exclusive.
pub const MAX_ELEMENT_LEN: usize = 24;

/// Lifecycle hooks for component specializations.
///
/// Hooks receive the owning tree so they can build out a subtree or adjust
/// state; the node's behavior is detached while its hook runs, so hooks may
/// freely mutate the tree, including the node itself.
#[allow(unused_variables)]
pub trait Behavior: Send {
    /// Called once when the component is created (or when a deferred root is
    /// loaded).
    fn on_create(&mut self, tree: &mut Tree, id: ComponentId) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Called when the component is appended to a parent.
    fn on_parent(&mut self, tree: &mut Tree, id: ComponentId, parent: ComponentId) {}

    /// Called exactly once when UID assignment visits the node under a stable
    /// root.
    fn on_root_finalized(&mut self, tree: &mut Tree, id: ComponentId, root: ComponentId) {}
}

/// Page-only state. Present on a node iff the component is a page root:
/// document-scoped event bindings and the navigation fullreload policy.
#[derive(Clone, Default)]
pub struct PageState {
    pub(crate) document_bindings: IndexMap<String, EventBinding>,
    /// Force clients to reload instead of accepting patches on navigation.
    pub fullpage_reload: bool,
    /// Response headers that force a fullpage reload when present
    /// (lowercased).
    pub fullpage_reload_headers: Vec<String>,
    pub(crate) dom_content_loaded_fired: bool,
}

impl std::fmt::Debug for PageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageState")
            .field("document_bindings", &self.document_bindings.len())
            .field("fullpage_reload", &self.fullpage_reload)
            .field("fullpage_reload_headers", &self.fullpage_reload_headers)
            .finish_non_exhaustive()
    }
}

impl PageState {
    pub fn new() -> Self {
        Self {
            document_bindings: IndexMap::new(),
            fullpage_reload: false,
            fullpage_reload_headers: vec!["set-cookie".to_string()],
            dom_content_loaded_fired: false,
        }
    }

    /// Names of the currently bound document events, in bind order.
    pub fn document_event_names(&self) -> impl Iterator<Item = &str> {
        self.document_bindings.keys().map(String::as_str)
    }
}

/// Memoized render outputs, keyed by the version counters of their inputs.
#[derive(Default)]
pub(crate) struct RenderCaches {
    /// Partial open-tag string plus inner text, keyed by
    /// (props_version, style_version, inner_text).
    pub partial: Option<PartialCache>,
    /// Fully rendered HTML, keyed by the global mutation counter.
    pub rendered: Option<(u64, String)>,
    /// VDOM snapshot, keyed by the global mutation counter. A hit is used
    /// only when the cached key still equals the current UID.
    pub vdom: Option<(u64, Arc<VNode>)>,
    /// Roots only: (children_structure_version, root uid) of the last UID
    /// assignment pass.
    pub uid_assignment: Option<(u64, String)>,
}

pub(crate) struct PartialCache {
    pub props_version: u64,
    pub style_version: u64,
    pub text: String,
    pub html: String,
}

/// A server-side HTML element with versioned props/style stores, optional
/// inner text and event bindings.
///
/// Construct with [`HtmlComponent::inner`] (accepts text and children) or
/// [`HtmlComponent::leaf`] (void elements), then insert into a
/// [`Tree`](crate::tree::Tree).
pub struct HtmlComponent {
    pub(crate) element: String,
    pub(crate) accept_inner_html: bool,
    pub(crate) inner_text: String,
    pub(crate) props: PropStore,
    pub(crate) style: PropStore,

    // tree links, managed by the owning Tree
    pub(crate) parent: Option<ComponentId>,
    pub(crate) children: Vec<ComponentId>,
    pub(crate) uid: Option<String>,

    // mutation tracking
    pub(crate) mutation_version: u64,
    pub(crate) children_structure_version: u64,

    // lifecycle & bookkeeping
    pub(crate) frozen: bool,
    pub(crate) loaded: bool,
    pub(crate) behavior: Option<Box<dyn Behavior>>,
    pub(crate) bindings: IndexMap<String, EventBinding>,
    pub(crate) event_bindings_changed: bool,
    pub(crate) on_root_finalized_called: bool,
    pub(crate) deep_nesting_warned: bool,
    pub(crate) validate_on_event: bool,
    pub(crate) add_to_registry: bool,
    pub(crate) lively_disabled: bool,
    pub(crate) page: Option<PageState>,

    pub(crate) caches: RenderCaches,
}

impl HtmlComponent {
    fn build(element: &str, accept_inner_html: bool) -> Result<Self, ComponentError> {
        let element = element.trim().to_lowercase();
        if element.is_empty() || !element.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(ComponentError::InvalidElement {
                tag: element,
                reason: "tags must match [A-Za-z0-9]+",
            });
        }
        if element.len() >= MAX_ELEMENT_LEN {
            return Err(ComponentError::InvalidElement {
                tag: element,
                reason: "tags must be shorter than 24 characters",
            });
        }

        Ok(Self {
            element,
            accept_inner_html,
            inner_text: String::new(),
            props: PropStore::new(),
            style: PropStore::new(),
            parent: None,
            children: Vec::new(),
            uid: None,
            mutation_version: 0,
            children_structure_version: 0,
            frozen: false,
            loaded: false,
            behavior: None,
            bindings: IndexMap::new(),
            event_bindings_changed: false,
            on_root_finalized_called: false,
            deep_nesting_warned: false,
            validate_on_event: true,
            add_to_registry: true,
            lively_disabled: false,
            page: None,
            caches: RenderCaches::default(),
        })
    }

    /// A component that accepts inner text and children, e.g. `<div>…</div>`.
    pub fn inner(element: &str) -> Result<Self, ComponentError> {
        Self::build(element, true)
    }

    /// A void component without a closing tag, e.g. `<input/>`.
    pub fn leaf(element: &str) -> Result<Self, ComponentError> {
        Self::build(element, false)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Result<Self, ComponentError> {
        if !self.accept_inner_html {
            return Err(ComponentError::NoInnerHtml);
        }
        self.inner_text = text.into();
        Ok(self)
    }

    pub fn with_prop(
        mut self,
        key: &str,
        value: impl Into<String>,
    ) -> Result<Self, ComponentError> {
        self.props.set(key, value)?;
        Ok(self)
    }

    pub fn with_props<K, V>(
        mut self,
        props: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, ComponentError>
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        self.props.extend(props)?;
        Ok(self)
    }

    pub fn with_style_prop(
        mut self,
        key: &str,
        value: impl Into<String>,
    ) -> Result<Self, ComponentError> {
        self.style.set(key, value)?;
        Ok(self)
    }

    pub fn with_style<K, V>(
        mut self,
        style: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, ComponentError>
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        self.style.extend(style)?;
        Ok(self)
    }

    pub fn with_behavior(mut self, behavior: impl Behavior + 'static) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    /// Mark the node as a page root, attaching document-event state and the
    /// fullreload policy.
    pub fn with_page_state(mut self, page: PageState) -> Self {
        self.page = Some(page);
        self
    }

    /// Exclude this component from the UID registry.
    pub fn without_registry(mut self) -> Self {
        self.add_to_registry = false;
        self
    }

    /// Never inject `data-*` runtime props into this component.
    pub fn with_lively_disabled(mut self) -> Self {
        self.lively_disabled = true;
        self
    }

    // accessors

    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn accept_inner_html(&self) -> bool {
        self.accept_inner_html
    }

    pub fn inner_text(&self) -> &str {
        &self.inner_text
    }

    pub fn props(&self) -> &PropStore {
        &self.props
    }

    pub fn style(&self) -> &PropStore {
        &self.style
    }

    pub fn parent(&self) -> Option<ComponentId> {
        self.parent
    }

    pub fn children(&self) -> &[ComponentId] {
        &self.children
    }

    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    pub fn mutation_version(&self) -> u64 {
        self.mutation_version
    }

    pub fn children_structure_version(&self) -> u64 {
        self.children_structure_version
    }

    pub fn is_page(&self) -> bool {
        self.page.is_some()
    }

    pub fn page(&self) -> Option<&PageState> {
        self.page.as_ref()
    }

    pub fn page_mut(&mut self) -> Option<&mut PageState> {
        self.page.as_mut()
    }

    /// Whether client-side validation runs before events are sent.
    pub fn validates_on_event(&self) -> bool {
        self.validate_on_event
    }

    /// Enable or disable client-side validation before events are sent.
    /// Rendered as `data-validate="false"` when disabled; `"true"` is
    /// implicit.
    pub fn toggle_validation(&mut self, must_validate: bool) {
        self.validate_on_event = must_validate;
    }

    /// Names of the bound element events, in bind order.
    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Whether the deep-nesting diagnostic already fired for this component.
    pub fn deep_nesting_warned(&self) -> bool {
        self.deep_nesting_warned
    }

    pub(crate) fn has_bindings(&self) -> bool {
        !self.bindings.is_empty()
    }
}

impl fmt::Debug for HtmlComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HtmlComponent")
            .field("element", &self.element)
            .field("uid", &self.uid)
            .field("children", &self.children.len())
            .field("frozen", &self.frozen)
            .finish_non_exhaustive()
    }
}
