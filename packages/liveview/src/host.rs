//! What the transport requires from the host application.
//!
//! HTTP routing stays outside this crate; navigation materializes pages by
//! handing a synthesized request back to the host and inspecting the
//! response.

use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};
use lively_core::SharedTree;

/// A synthesized request, built from a navigation message. The CSP nonce of
/// the original connection's request rides along so inline scripts keep
/// matching after patching.
#[derive(Debug, Clone)]
pub struct HostRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub csp_nonce: Option<String>,
}

impl HostRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            headers: HeaderMap::new(),
            csp_nonce: None,
        }
    }
}

/// The host's answer. Only component responses can be diffed; everything
/// else makes navigation fall back to a full reload.
pub enum HostResponse {
    /// The route produced a component page.
    Component {
        tree: SharedTree,
        headers: HeaderMap,
    },
    /// Any non-component response.
    Other {
        status: StatusCode,
        headers: HeaderMap,
    },
}

impl std::fmt::Debug for HostResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostResponse::Component { headers, .. } => f
                .debug_struct("HostResponse::Component")
                .field("headers", &headers.len())
                .finish(),
            HostResponse::Other { status, .. } => f
                .debug_struct("HostResponse::Other")
                .field("status", status)
                .finish(),
        }
    }
}

/// The application the transport runs inside.
#[async_trait]
pub trait HostApp: Send + Sync {
    /// Run a request through the host's HTTP pipeline. Used to materialize
    /// navigation targets.
    async fn serve_request(&self, request: HostRequest) -> HostResponse;

    /// Resolve a named route (the WebSocket endpoint, static runtime files)
    /// to a path.
    fn resolve(&self, name: &str) -> Option<String>;

    /// Gates verbose logging and component-unknown replies.
    fn debug_enabled(&self) -> bool {
        false
    }
}

/// A host with no routes; navigation always falls back to full reloads.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRoutes;

#[async_trait]
impl HostApp for NoRoutes {
    async fn serve_request(&self, _request: HostRequest) -> HostResponse {
        HostResponse::Other {
            status: StatusCode::NOT_FOUND,
            headers: HeaderMap::new(),
        }
    }

    fn resolve(&self, _name: &str) -> Option<String> {
        None
    }
}
