//! Error taxonomy for the component system.

use crate::tree::ComponentId;

/// Errors raised by component construction, tree manipulation and rendering.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    /// The element tag failed validation at construction time.
    #[error("invalid element tag `{tag}`: {reason}")]
    InvalidElement { tag: String, reason: &'static str },

    /// Inner text was supplied to a component that does not accept it.
    #[error("component does not accept inner html, use an inner component instead")]
    NoInnerHtml,

    /// A store key was empty after normalization.
    #[error("prop/style keys must be non-empty strings")]
    EmptyKey,

    /// The child is already attached to a parent.
    #[error("component {0:?} is already added to a parent, remove it first")]
    AlreadyParented(ComponentId),

    /// The component was not found among the parent's children.
    #[error("component {child:?} is not a child of {parent:?}")]
    NotAChild {
        parent: ComponentId,
        child: ComponentId,
    },

    /// A child index was past the end of the children list.
    #[error("child index {index} is out of bounds for {parent:?}")]
    ChildIndexOutOfBounds { parent: ComponentId, index: usize },

    /// Attaching the child would create a cycle in the tree.
    #[error("component {0:?} is an ancestor of the requested parent")]
    WouldCycle(ComponentId),

    /// The id does not refer to a live node in this tree.
    #[error("unknown component id {0:?}")]
    UnknownId(ComponentId),

    /// A mutation was attempted on a frozen component.
    #[error("mutation not allowed on frozen component {0:?}")]
    Frozen(ComponentId),

    /// The component's UID has not been assigned yet.
    #[error("uid is not assigned yet, `assign_uids` must run first")]
    UidNotAssigned,

    /// An operation that requires a root component got a child.
    #[error("operation requires a root component, got a child")]
    NotARoot,

    /// An operation that requires a mounted component got a root.
    #[error("operation requires a component with a parent")]
    NoParent,

    /// The component is not loaded yet (deferred root).
    #[error("component is not loaded yet: {0}")]
    NotLoaded(String),

    /// `on_create` of a deferred root ran twice.
    #[error("component is already loaded")]
    AlreadyLoaded,

    /// Copying the subtree is not permitted.
    #[error("cannot copy component: {0}")]
    CopyRefused(&'static str),

    /// Event-binding failure.
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// Force-update validation failure.
    #[error(transparent)]
    ForceUpdate(#[from] ForceUpdateError),
}

/// Errors raised while binding or resolving event handlers.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    /// The event name is not in the recognized set and `force_bind` was not used.
    #[error("event `{0}` not recognized, pass force_bind to bind anyway")]
    UnknownEvent(String),

    /// The event already carries a handler.
    #[error("event `{0}` already bound, unbind it first")]
    AlreadyBound(String),

    /// Two update targets share a parent or a root.
    #[error("conflicting update targets {0:?} and {1:?}: {2}")]
    RedundantUpdate(ComponentId, ComponentId, &'static str),

    /// Document events may only be bound on page components.
    #[error("document events can only be bound on page components")]
    NotAPage,

    /// The event is not bound on this component.
    #[error("event `{0}` is not bound to this component")]
    NotBound(String),
}

/// Errors raised while validating a [`ForceUpdate`](crate::force_update::ForceUpdate).
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ForceUpdateError {
    /// Force updates only apply to mounted components.
    #[error("force updates require a component with a parent, roots are not supported")]
    RootTarget,

    /// `All` cannot be combined with other update kinds.
    #[error("update `all` cannot be combined with other updates")]
    RedundantAll,

    /// `Text` and `InnerHtml` mean the same thing.
    #[error("updates `text` and `inner_html` mean the same thing, include only one")]
    RedundantText,

    /// The target component has no inner text to update.
    #[error("component does not support text updates")]
    NoInnerHtml,
}

/// Raised when JavaScript execution on the client fails or the socket drops.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JsExecutionError {
    /// The client reported an exception or the connection went away.
    #[error("javascript execution failed: {0}")]
    Failed(String),

    /// No result arrived within the caller's timeout.
    #[error("javascript execution timed out: {0}")]
    TimedOut(String),
}
