//! Event handlers, bindings and the client interface handlers talk back
//! through.

use std::sync::Arc;
use std::time::Duration;

pub use futures_util::future::BoxFuture;

use crate::error::JsExecutionError;
use crate::force_update::ForceUpdate;
use crate::tree::{ComponentId, Tree};

/// DOM events accepted by `bind` without `force_bind`.
pub const KNOWN_EVENTS: &[&str] = &[
    // mouse
    "click",
    "dblclick",
    "mousedown",
    "mouseup",
    "mouseenter",
    "mouseleave",
    "mousemove",
    "mouseover",
    "mouseout",
    "contextmenu",
    // keyboard
    "keydown",
    "keypress",
    "keyup",
    // form
    "input",
    "change",
    "submit",
    "reset",
    "invalid",
    "select",
    // focus
    "focus",
    "blur",
    "focusin",
    "focusout",
    // drag
    "drag",
    "dragstart",
    "dragend",
    "dragenter",
    "dragleave",
    "dragover",
    "drop",
    // clipboard
    "copy",
    "cut",
    "paste",
    // media
    "abort",
    "canplay",
    "canplaythrough",
    "cuechange",
    "durationchange",
    "emptied",
    "ended",
    "error",
    "loadeddata",
    "loadedmetadata",
    "loadstart",
    "pause",
    "play",
    "playing",
    "progress",
    "ratechange",
    "seeked",
    "seeking",
    "stalled",
    "suspend",
    "timeupdate",
    "volumechange",
    "waiting",
    // touch
    "touchstart",
    "touchmove",
    "touchend",
    "touchcancel",
    // pointer
    "pointerdown",
    "pointerup",
    "pointermove",
    "pointerover",
    "pointerout",
    "pointerenter",
    "pointerleave",
    "gotpointercapture",
    "lostpointercapture",
    "pointercancel",
    // wheel and scroll
    "wheel",
    "scroll",
    // animation and transition
    "animationstart",
    "animationend",
    "animationiteration",
    "transitionstart",
    "transitionend",
    "transitionrun",
    "transitioncancel",
    // other global events
    "resize",
    "load",
    "unload",
    "beforeunload",
    "hashchange",
    "popstate",
    "storage",
    "pagehide",
    "pageshow",
];

/// Document-scoped events accepted by `document_bind` without `force_bind`.
pub const KNOWN_DOCUMENT_EVENTS: &[&str] = &["DOMContentLoaded", "LivelyNavigated"];

pub fn is_known_event(event: &str) -> bool {
    KNOWN_EVENTS.contains(&event)
}

pub fn is_known_document_event(event: &str) -> bool {
    KNOWN_DOCUMENT_EVENTS.contains(&event)
}

/// Error type for user handlers; anything the handler wants to surface.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Handlers may return force-update descriptors to emit targeted patches
/// regardless of the diff outcome.
pub type HandlerResult = Result<Vec<ForceUpdate>, HandlerError>;

/// Everything an event handler gets to work with: mutable access to the tree,
/// the component and event that fired, and the connection for JS round-trips.
pub struct EventScope<'a> {
    pub tree: &'a mut Tree,
    /// The component the event was dispatched to.
    pub component: ComponentId,
    pub event: &'a str,
    /// The event value reported by the client (e.g. an input's value).
    pub value: &'a str,
    pub client: &'a dyn LiveClient,
}

/// A bound event handler, synchronous or asynchronous. The dispatcher awaits
/// asynchronous handlers inline; synchronous ones run on the spot.
#[derive(Clone)]
pub enum EventHandler {
    Sync(Arc<dyn Fn(EventScope<'_>) -> HandlerResult + Send + Sync>),
    Async(Arc<dyn for<'a> Fn(EventScope<'a>) -> BoxFuture<'a, HandlerResult> + Send + Sync>),
}

impl EventHandler {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(EventScope<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        EventHandler::Sync(Arc::new(f))
    }

    pub fn asynchronous<F>(f: F) -> Self
    where
        F: for<'a> Fn(EventScope<'a>) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        EventHandler::Async(Arc::new(f))
    }

    pub async fn invoke(&self, scope: EventScope<'_>) -> HandlerResult {
        match self {
            EventHandler::Sync(f) => f(scope),
            EventHandler::Async(f) => f(scope).await,
        }
    }
}

impl std::fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventHandler::Sync(_) => f.write_str("EventHandler::Sync"),
            EventHandler::Async(_) => f.write_str("EventHandler::Async"),
        }
    }
}

/// A handler plus the components it may update. Stored per event name on the
/// component (element events) or on the page state (document events).
#[derive(Clone, Debug)]
pub struct EventBinding {
    pub handler: EventHandler,
    /// Update targets beyond the component itself.
    pub targets: Vec<ComponentId>,
    /// Whether the component's own subtree is diffed after the handler runs.
    pub update_self: bool,
}

impl EventBinding {
    /// The set of components to diff: explicit targets, plus the component
    /// itself when `update_self` holds.
    pub fn resolved_targets(&self, component: ComponentId) -> Vec<ComponentId> {
        let mut targets = self.targets.clone();
        if self.update_self && !targets.contains(&component) {
            targets.push(component);
        }
        targets
    }
}

/// Options for [`Tree::bind`](crate::tree::Tree::bind).
#[derive(Debug, Clone)]
pub struct BindOptions {
    /// Bind even if the event name is not in the recognized set.
    pub force_bind: bool,
    /// Other components whose subtrees may change when this event fires.
    pub update_targets: Vec<ComponentId>,
    /// Whether this component's own subtree may change. Defaults to true.
    pub update_self: bool,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl BindOptions {
    pub fn new() -> Self {
        Self {
            force_bind: false,
            update_targets: Vec::new(),
            update_self: true,
        }
    }

    pub fn force_bind(mut self) -> Self {
        self.force_bind = true;
        self
    }

    pub fn update_targets(mut self, targets: Vec<ComponentId>) -> Self {
        self.update_targets = targets;
        self
    }

    pub fn update_self(mut self, update_self: bool) -> Self {
        self.update_self = update_self;
        self
    }
}

/// The connection surface handlers can reach: JS execution round-trips on the
/// live WebSocket. Implemented by the transport; a no-op stand-in is available
/// for tests.
pub trait LiveClient: Send + Sync {
    /// Ask the client to execute `code`. With `wait_for_result` the future
    /// resolves once the client acknowledges execution; a timeout is required
    /// in that case and forbidden otherwise.
    fn execute_js<'a>(
        &'a self,
        code: &'a str,
        timeout: Option<Duration>,
        wait_for_result: bool,
    ) -> BoxFuture<'a, Result<Option<rmpv::Value>, JsExecutionError>>;

    /// Execute `code` and fetch the value of `variable` afterwards.
    fn get_js_result<'a>(
        &'a self,
        code: &'a str,
        variable: &'a str,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<rmpv::Value, JsExecutionError>>;
}

/// A [`LiveClient`] that discards JS requests; used when dispatching events
/// outside a live connection (tests, offline rendering).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopClient;

impl LiveClient for NoopClient {
    fn execute_js<'a>(
        &'a self,
        _code: &'a str,
        _timeout: Option<Duration>,
        wait_for_result: bool,
    ) -> BoxFuture<'a, Result<Option<rmpv::Value>, JsExecutionError>> {
        Box::pin(async move {
            if wait_for_result {
                Err(JsExecutionError::Failed("no client attached".into()))
            } else {
                Ok(None)
            }
        })
    }

    fn get_js_result<'a>(
        &'a self,
        _code: &'a str,
        _variable: &'a str,
        _timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<rmpv::Value, JsExecutionError>> {
        Box::pin(async move { Err(JsExecutionError::Failed("no client attached".into())) })
    }
}
