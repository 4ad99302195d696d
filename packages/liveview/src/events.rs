//! Inbound component-event dispatch: look up the component, run the bound
//! handler, stream the resulting patches.

use std::future::ready;

use tracing::warn;

use lively_core::{diff_and_act, EventScope, LiveClient, Patch};

use crate::error::LiveViewError;
use crate::protocol::Outbound;
use crate::socket::ConnCtx;

pub(crate) async fn dispatch_component_event(
    ctx: &ConnCtx,
    root_uid: &str,
    uid: &str,
    event: &str,
    value: &str,
    is_document_event: bool,
) -> Result<(), LiveViewError> {
    let Some(shared) = ctx.registry.get(root_uid) else {
        return unknown_component(ctx, root_uid, uid, is_document_event);
    };

    let mut tree = shared.lock().await;
    let Some(component) = tree.lookup_uid(uid) else {
        drop(tree);
        return unknown_component(ctx, root_uid, uid, is_document_event);
    };

    // Document events target pages only
    if is_document_event && !tree.get(component)?.is_page() {
        if ctx.config.debug {
            warn!(
                uid,
                event,
                "document-scoped event hit a non-page component; bind document \
                 events on page components only"
            );
        }
        return Ok(());
    }

    // DOMContentLoaded runs at most once per page instance; back navigation
    // revisits pages that already initialized
    if is_document_event && event == "DOMContentLoaded" && tree.dom_content_loaded_fired(component)
    {
        return Ok(());
    }

    let binding = if is_document_event {
        tree.document_binding(component, event)?
    } else {
        tree.event_binding(component, event)?
    };
    let targets = binding.resolved_targets(component);

    // Pre-event snapshots for every update target
    let mut old_vdoms = Vec::with_capacity(targets.len());
    for &target in &targets {
        old_vdoms.push((target, tree.to_vdom(target)?));
    }

    let scope = EventScope {
        tree: &mut *tree,
        component,
        event,
        value,
        client: &ctx.handle as &dyn LiveClient,
    };
    let force_updates = binding
        .handler
        .invoke(scope)
        .await
        .map_err(|e| LiveViewError::Handler(e.to_string()))?;

    // Force-update patches go out first, deduplicated among themselves and
    // against the diff pass below
    let mut force_sent: Vec<Patch> = Vec::new();
    let mut props_patch_sent = false;
    for force_update in &force_updates {
        for patch in force_update.generate_patches(&mut tree)? {
            if force_sent.contains(&patch) {
                continue;
            }
            if patch_replaces_props_of(&patch, uid) {
                props_patch_sent = true;
            }
            ctx.handle.send_patches(vec![patch.clone()])?;
            force_sent.push(patch);
        }
    }

    // Diff every update target against its pre-event snapshot, streaming
    // patches in iteration order
    for (target, old_vdom) in old_vdoms {
        let new_vdom = tree.to_vdom(target)?;
        let handle = &ctx.handle;
        let force_sent_ref = &force_sent;
        let props_patch_sent_ref = &mut props_patch_sent;
        let mut act = move |patch: Patch| {
            let result = if force_sent_ref.contains(&patch) {
                Ok(())
            } else {
                if patch_replaces_props_of(&patch, uid) {
                    *props_patch_sent_ref = true;
                }
                handle.send_patches(vec![patch])
            };
            ready(result)
        };
        diff_and_act(&mut act, &old_vdom, &new_vdom).await?;
    }

    if is_document_event && event == "DOMContentLoaded" {
        tree.mark_dom_content_loaded(component);
    }

    // Keep data-events in sync: if the handler changed bindings and no props
    // patch for the component went out, synthesize one
    if props_patch_sent {
        tree.reset_event_bindings_changed(component);
    } else if tree.event_bindings_changed(component) {
        let props = tree.props_snapshot(component)?;
        let key = tree.require_uid(component)?.to_string();
        ctx.handle.send_patches(vec![Patch::ReplaceProps { key, props }])?;
        tree.reset_event_bindings_changed(component);
    }

    Ok(())
}

fn patch_replaces_props_of(patch: &Patch, uid: &str) -> bool {
    matches!(patch, Patch::ReplaceProps { key, .. } if key == uid)
}

/// The UID resolves to nothing: warn and answer with a component-unknown
/// message in debug mode, silently drop otherwise.
fn unknown_component(
    ctx: &ConnCtx,
    root_uid: &str,
    uid: &str,
    is_document_event: bool,
) -> Result<(), LiveViewError> {
    if !ctx.config.debug {
        return Ok(());
    }
    if is_document_event {
        warn!(
            uid,
            root_uid,
            "component requested by ws client not found; this looks like a \
             document-level event, make sure document events are bound on page \
             components"
        );
    } else {
        warn!(
            uid,
            root_uid,
            "component requested by ws client not found; it may be unbound, \
             missing, or evicted from the registry"
        );
    }
    ctx.handle.send(&Outbound::ComponentUnknown {
        uid: uid.to_owned(),
        must_reload: ctx.config.reload_on_unknown_components,
    })
}
