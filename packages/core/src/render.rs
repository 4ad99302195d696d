//! HTML string rendering and VDOM snapshots, both memoized against the
//! mutation counters.

use std::sync::Arc;

use crate::component::PartialCache;
use crate::error::ComponentError;
use crate::tree::{ComponentId, Tree};
use crate::vdom::VNode;

impl Tree {
    /// Render the designated root to an HTML string.
    pub fn render_root(&mut self) -> Result<String, ComponentError> {
        let root = self.root();
        self.render(root)
    }

    /// Render the subtree rooted at `id` to an HTML string.
    ///
    /// Root renders assign UIDs first so `data-uid` is stable in the output;
    /// a node mounted after the last assignment triggers a forced reassign
    /// from its root.
    pub fn render(&mut self, id: ComponentId) -> Result<String, ComponentError> {
        self.ensure_loaded(id)?;
        self.ensure_uid_current(id)?;
        self.render_node(id)
    }

    /// Snapshot the subtree rooted at `id` as an immutable VDOM node.
    pub fn to_vdom(&mut self, id: ComponentId) -> Result<Arc<VNode>, ComponentError> {
        self.ensure_loaded(id)?;
        self.ensure_uid_current(id)?;
        self.vdom_node(id)
    }

    fn ensure_loaded(&self, id: ComponentId) -> Result<(), ComponentError> {
        let node = self.node(id)?;
        if !node.loaded {
            return Err(ComponentError::NotLoaded(
                "the component may be a deferred page; call load_root first".into(),
            ));
        }
        Ok(())
    }

    fn ensure_uid_current(&mut self, id: ComponentId) -> Result<(), ComponentError> {
        if id == self.root() {
            self.assign_uids(false)?;
            return Ok(());
        }
        if self.uid_of(id).is_none() {
            // Mounted after the last assignment pass, e.g. inside an event
            // handler. Reassign the whole tree so the structure stays intact.
            if self.root_of(id) == self.root() {
                self.assign_uids(true)?;
            }
        }
        Ok(())
    }

    fn render_node(&mut self, id: ComponentId) -> Result<String, ComponentError> {
        self.sync_data_props(id)?;

        let node = self.node(id)?;
        if let Some((version, output)) = &node.caches.rendered {
            if *version == node.mutation_version {
                return Ok(output.clone());
            }
        }

        let mutation_version = node.mutation_version;
        let accept_inner_html = node.accept_inner_html;
        let element = node.element.clone();

        let mut output = self.partial_string(id)?;
        if accept_inner_html {
            for child in self.children_of(id).to_vec() {
                output.push_str(&self.render_node(child)?);
            }
            output.push_str("</");
            output.push_str(&element);
            output.push('>');
        }

        self.node_mut(id)?.caches.rendered = Some((mutation_version, output.clone()));
        Ok(output)
    }

    /// The open tag (props + style serialized) plus the inner text, without
    /// children. Cached against the store versions and the text.
    fn partial_string(&mut self, id: ComponentId) -> Result<String, ComponentError> {
        let node = self.node(id)?;
        let props_version = node.props.version();
        let style_version = node.style.version();

        if let Some(cache) = &node.caches.partial {
            if cache.props_version == props_version
                && cache.style_version == style_version
                && cache.text == node.inner_text
            {
                return Ok(cache.html.clone());
            }
        }

        let mut html = String::with_capacity(32);
        html.push('<');
        html.push_str(&node.element);
        if !node.props.is_empty() {
            html.push(' ');
            let mut first = true;
            for (key, value) in node.props.iter() {
                if !first {
                    html.push(' ');
                }
                first = false;
                html.push_str(key);
                html.push_str("=\"");
                html.push_str(value);
                html.push('"');
            }
        }
        if !node.style.is_empty() {
            html.push_str(" style=\"");
            let mut first = true;
            for (key, value) in node.style.iter() {
                if !first {
                    html.push(';');
                }
                first = false;
                html.push_str(key);
                html.push(':');
                html.push_str(value);
            }
            html.push('"');
        }
        if node.accept_inner_html {
            html.push('>');
            html.push_str(&node.inner_text);
        } else {
            html.push_str("/>");
        }

        let text = node.inner_text.clone();
        self.node_mut(id)?.caches.partial = Some(PartialCache {
            props_version,
            style_version,
            text,
            html: html.clone(),
        });
        Ok(html)
    }

    fn vdom_node(&mut self, id: ComponentId) -> Result<Arc<VNode>, ComponentError> {
        self.sync_data_props(id)?;

        let node = self.node(id)?;
        if let Some((version, cached)) = &node.caches.vdom {
            // A hit is valid only while the cached key still names the node
            if *version == node.mutation_version && node.uid.as_deref() == Some(cached.key.as_str())
            {
                return Ok(Arc::clone(cached));
            }
        }

        let mutation_version = node.mutation_version;
        let key = self.require_uid(id)?.to_string();

        let mut children = Vec::with_capacity(self.children_of(id).len());
        for child in self.children_of(id).to_vec() {
            children.push(self.vdom_node(child)?);
        }

        let node = self.node(id)?;
        let vnode = Arc::new(VNode {
            tag: node.element.clone(),
            key,
            props: node.props.to_map(),
            style: node.style.to_map(),
            text: node.accept_inner_html.then(|| node.inner_text.clone()),
            children,
            component: id,
        });

        self.node_mut(id)?.caches.vdom = Some((mutation_version, Arc::clone(&vnode)));
        Ok(vnode)
    }
}
