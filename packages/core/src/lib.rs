//! Core of the Lively component system: a server-side tree of HTML
//! components with versioned stores, mutation tracking, deterministic UIDs,
//! memoized rendering and a keyed virtual-DOM diff.
//!
//! Components live in a [`Tree`] arena and are addressed by [`ComponentId`].
//! Mutating a component bumps its version counters and every ancestor's, so
//! renders and VDOM snapshots regenerate lazily and only where something
//! changed. Two snapshots of the same tree diff into the minimal patch list a
//! client needs to catch up.
//!
//! ```
//! use lively_core::prelude::*;
//!
//! # fn main() -> Result<(), ComponentError> {
//! let mut tree = Tree::new(HtmlComponent::inner("div")?)?;
//! let label = tree.create(HtmlComponent::inner("span")?.with_text("hello")?)?;
//! tree.append_child(tree.root(), label)?;
//!
//! let before = tree.to_vdom(tree.root())?;
//! tree.set_inner_text(label, "goodbye")?;
//! let after = tree.to_vdom(tree.root())?;
//!
//! assert_eq!(diff(&before, &after).len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod component;
pub mod diff;
pub mod error;
pub mod events;
pub mod force_update;
pub mod mutation;
pub mod props;
pub mod registry;
pub mod tree;
pub mod vdom;

mod render;
mod uid;

pub use component::{Behavior, HtmlComponent, PageState, MAX_ELEMENT_LEN};
pub use diff::{diff, diff_and_act, Patch, PatchCode};
pub use error::{BindingError, ComponentError, ForceUpdateError, JsExecutionError};
pub use events::{
    BindOptions, BoxFuture, EventBinding, EventHandler, EventScope, HandlerError, HandlerResult,
    LiveClient, NoopClient, KNOWN_DOCUMENT_EVENTS, KNOWN_EVENTS,
};
pub use force_update::{ForceUpdate, UpdateKind};
pub use mutation::{Mutation, MutationCode};
pub use props::{PropStore, StoreChange};
pub use registry::{Registry, SharedTree};
pub use tree::{ComponentId, Tree};
pub use uid::MAX_EVENT_NESTING_LEVEL;
pub use vdom::VNode;

pub mod prelude {
    //! Everything an application usually needs in scope.
    pub use crate::component::{Behavior, HtmlComponent, PageState};
    pub use crate::diff::{diff, diff_and_act, Patch, PatchCode};
    pub use crate::error::{BindingError, ComponentError, ForceUpdateError, JsExecutionError};
    pub use crate::events::{
        BindOptions, EventBinding, EventHandler, EventScope, HandlerResult, LiveClient, NoopClient,
    };
    pub use crate::force_update::{ForceUpdate, UpdateKind};
    pub use crate::registry::{Registry, SharedTree};
    pub use crate::tree::{ComponentId, Tree};
    pub use crate::vdom::VNode;
}
