//! Navigation: minimal patches between the page the client shows and the one
//! it asked for, falling back to a full reload whenever diffing is impossible
//! or unsafe.

use std::future::ready;

use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use tracing::warn;

use lively_core::{diff_and_act, Patch, SharedTree};

use crate::error::LiveViewError;
use crate::host::{HostRequest, HostResponse};
use crate::protocol::Outbound;
use crate::socket::ConnCtx;

pub(crate) async fn handle_navigation(
    ctx: &ConnCtx,
    prev_root_uid: &str,
    next_uid: Option<String>,
    path: &str,
    headers: Vec<(String, String)>,
) {
    if let Err(error) = try_navigate(ctx, prev_root_uid, next_uid, path, headers).await {
        if ctx.config.debug {
            warn!(%error, path, "navigation failed, falling back to full reload");
        }
        // Every failure with a known path degrades to a full client reload
        if !path.is_empty() {
            let _ = send_fullreload(ctx, path);
        }
    }
}

async fn try_navigate(
    ctx: &ConnCtx,
    prev_root_uid: &str,
    next_uid: Option<String>,
    path: &str,
    headers: Vec<(String, String)>,
) -> Result<(), LiveViewError> {
    if prev_root_uid.is_empty() || path.is_empty() {
        return send_fullreload(ctx, path);
    }

    // The previous page must still be alive in the registry to diff against
    let Some(prev_shared) = ctx.registry.get(prev_root_uid) else {
        return send_fullreload(ctx, path);
    };
    {
        let prev = prev_shared.lock().await;
        if prev.lookup_uid(prev_root_uid).is_none() {
            return send_fullreload(ctx, path);
        }
    }

    let mut response_headers = HeaderMap::new();
    let next_shared: Option<SharedTree> = match &next_uid {
        // The client already knows the target page
        Some(uid) => ctx.registry.get(uid),
        // Materialize the target through the host's HTTP pipeline
        None => {
            let request = HostRequest {
                method: http::Method::GET,
                path: path.to_owned(),
                headers: build_header_map(&headers),
                csp_nonce: ctx.csp_nonce.clone(),
            };
            match ctx.host.serve_request(request).await {
                HostResponse::Component { tree, headers } => {
                    response_headers = headers;
                    Some(tree)
                }
                HostResponse::Other { .. } => None,
            }
        }
    };
    let Some(next_shared) = next_shared else {
        return send_fullreload(ctx, path);
    };

    let (next_vdom, next_root_uid) = {
        let mut next = next_shared.lock().await;
        let root = next.root();

        // The page may demand a reload outright, or the response may carry a
        // header (set-cookie and friends) that patching cannot honor
        let demands_fullreload = next.get(root)?.page().is_some_and(|page| {
            page.fullpage_reload
                || page
                    .fullpage_reload_headers
                    .iter()
                    .any(|name| response_headers.contains_key(name.as_str()))
        });
        if demands_fullreload {
            drop(next);
            return send_fullreload(ctx, path);
        }

        let vdom = next.to_vdom(root)?;
        let uid = next.require_uid(root)?.to_string();
        (vdom, uid)
    };

    // Future events against the new page must resolve
    ctx.registry
        .insert(next_root_uid.clone(), next_shared.clone());

    let prev_vdom = {
        let mut prev = prev_shared.lock().await;
        let root = prev.root();
        prev.to_vdom(root)?
    };

    // Stream one navigation result per patch, then a final empty one
    let handle = &ctx.handle;
    let uid_for_patches = next_root_uid.clone();
    let mut act = move |patch: Patch| {
        let result = handle.send(&Outbound::NavigationResult {
            path: path.to_owned(),
            fullreload: false,
            component_uid: Some(uid_for_patches.clone()),
            patches: vec![patch],
            is_final: false,
        });
        ready(result)
    };
    diff_and_act(&mut act, &prev_vdom, &next_vdom).await?;

    ctx.handle.send(&Outbound::NavigationResult {
        path: path.to_owned(),
        fullreload: false,
        component_uid: Some(next_root_uid),
        patches: Vec::new(),
        is_final: true,
    })
}

fn send_fullreload(ctx: &ConnCtx, path: &str) -> Result<(), LiveViewError> {
    ctx.handle.send(&Outbound::NavigationResult {
        path: path.to_owned(),
        fullreload: true,
        component_uid: None,
        patches: Vec::new(),
        is_final: true,
    })
}

fn build_header_map(headers: &[(String, String)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            continue;
        };
        let Ok(value) = HeaderValue::from_str(value) else {
            continue;
        };
        map.append(name, value);
    }
    map
}
