//! Key-based diffing of VDOM snapshots into minimal patch lists.
//!
//! Move detection is deliberately absent: UIDs are positional, so reordering
//! manifests as remove + insert, and replace-by-tag handles type changes.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::vdom::VNode;

/// Patch operation codes, as transmitted in the first element of each compact
/// patch list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PatchCode {
    ReplaceNode = 0,
    RemoveNode = 1,
    InsertNode = 2,
    AlterText = 3,
    ReplaceProps = 4,
    ReplaceStyle = 5,
}

/// A minimal DOM edit instruction. Encoded on the wire as
/// `[opcode, key, ...payload]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// Replace the entire node under `key` with the serialized new node.
    ReplaceNode { key: String, node: Arc<VNode> },
    /// Remove the node under `key`.
    RemoveNode { key: String },
    /// Insert a new node at `index` among the children of `parent`.
    InsertNode {
        parent: String,
        index: usize,
        node: Arc<VNode>,
    },
    /// Change the text content of the node under `key`.
    AlterText { key: String, text: Option<String> },
    /// Replace all HTML attributes of the node under `key`.
    ReplaceProps {
        key: String,
        props: IndexMap<String, String>,
    },
    /// Replace all inline styles of the node under `key`.
    ReplaceStyle {
        key: String,
        style: IndexMap<String, String>,
    },
}

impl Patch {
    pub fn code(&self) -> PatchCode {
        match self {
            Patch::ReplaceNode { .. } => PatchCode::ReplaceNode,
            Patch::RemoveNode { .. } => PatchCode::RemoveNode,
            Patch::InsertNode { .. } => PatchCode::InsertNode,
            Patch::AlterText { .. } => PatchCode::AlterText,
            Patch::ReplaceProps { .. } => PatchCode::ReplaceProps,
            Patch::ReplaceStyle { .. } => PatchCode::ReplaceStyle,
        }
    }

    /// The key of the node the patch applies to (the parent for inserts).
    pub fn key(&self) -> &str {
        match self {
            Patch::ReplaceNode { key, .. }
            | Patch::RemoveNode { key }
            | Patch::AlterText { key, .. }
            | Patch::ReplaceProps { key, .. }
            | Patch::ReplaceStyle { key, .. } => key,
            Patch::InsertNode { parent, .. } => parent,
        }
    }
}

/// Compute the minimal patch list that transforms `old` into `new`.
pub fn diff(old: &Arc<VNode>, new: &Arc<VNode>) -> Vec<Patch> {
    let mut patches = Vec::new();
    diff_into(&mut patches, old, new);
    patches
}

fn diff_into(patches: &mut Vec<Patch>, old: &Arc<VNode>, new: &Arc<VNode>) {
    // Replace node wholesale if tags differ
    if old.tag != new.tag {
        patches.push(Patch::ReplaceNode {
            key: old.key.clone(),
            node: Arc::clone(new),
        });
        return;
    }

    if old.text != new.text {
        patches.push(Patch::AlterText {
            key: old.key.clone(),
            text: new.text.clone(),
        });
    }

    // Wholesale replacement, no key-level diff
    if old.props != new.props {
        patches.push(Patch::ReplaceProps {
            key: old.key.clone(),
            props: new.props.clone(),
        });
    }

    if old.style != new.style {
        patches.push(Patch::ReplaceStyle {
            key: old.key.clone(),
            style: new.style.clone(),
        });
    }

    let old_by_key: FxHashMap<&str, &Arc<VNode>> = old
        .children
        .iter()
        .map(|child| (child.key.as_str(), child))
        .collect();
    let new_keys: FxHashSet<&str> = new.children.iter().map(|c| c.key.as_str()).collect();

    // Remove nodes that no longer exist
    for old_child in &old.children {
        if !new_keys.contains(old_child.key.as_str()) {
            patches.push(Patch::RemoveNode {
                key: old_child.key.clone(),
            });
        }
    }

    // Insert new nodes and diff existing nodes
    for (index, new_child) in new.children.iter().enumerate() {
        match old_by_key.get(new_child.key.as_str()) {
            None => patches.push(Patch::InsertNode {
                parent: old.key.clone(),
                index,
                node: Arc::clone(new_child),
            }),
            Some(old_child) => diff_into(patches, old_child, new_child),
        }
    }
}

/// Diff `old` against `new`, handing every patch to `act` as soon as it is
/// found instead of collecting them. Patch order is identical to [`diff`].
pub async fn diff_and_act<F, Fut, E>(act: &mut F, old: &Arc<VNode>, new: &Arc<VNode>) -> Result<(), E>
where
    F: FnMut(Patch) -> Fut + Send,
    Fut: Future<Output = Result<(), E>> + Send,
    E: Send,
{
    diff_and_act_inner(act, old, new).await
}

fn diff_and_act_inner<'a, F, Fut, E>(
    act: &'a mut F,
    old: &'a Arc<VNode>,
    new: &'a Arc<VNode>,
) -> BoxFuture<'a, Result<(), E>>
where
    F: FnMut(Patch) -> Fut + Send,
    Fut: Future<Output = Result<(), E>> + Send,
    E: Send,
{
    Box::pin(async move {
        if old.tag != new.tag {
            act(Patch::ReplaceNode {
                key: old.key.clone(),
                node: Arc::clone(new),
            })
            .await?;
            return Ok(());
        }

        if old.text != new.text {
            act(Patch::AlterText {
                key: old.key.clone(),
                text: new.text.clone(),
            })
            .await?;
        }

        if old.props != new.props {
            act(Patch::ReplaceProps {
                key: old.key.clone(),
                props: new.props.clone(),
            })
            .await?;
        }

        if old.style != new.style {
            act(Patch::ReplaceStyle {
                key: old.key.clone(),
                style: new.style.clone(),
            })
            .await?;
        }

        let new_keys: FxHashSet<&str> = new.children.iter().map(|c| c.key.as_str()).collect();

        for old_child in &old.children {
            if !new_keys.contains(old_child.key.as_str()) {
                act(Patch::RemoveNode {
                    key: old_child.key.clone(),
                })
                .await?;
            }
        }

        let old_by_key: FxHashMap<&str, &Arc<VNode>> = old
            .children
            .iter()
            .map(|child| (child.key.as_str(), child))
            .collect();

        for (index, new_child) in new.children.iter().enumerate() {
            match old_by_key.get(new_child.key.as_str()) {
                None => {
                    act(Patch::InsertNode {
                        parent: old.key.clone(),
                        index,
                        node: Arc::clone(new_child),
                    })
                    .await?;
                }
                Some(old_child) => {
                    diff_and_act_inner(act, old_child, new_child).await?;
                }
            }
        }

        Ok(())
    })
}

#[cfg(feature = "serialize")]
mod serialize {
    use super::{Patch, PatchCode};
    use serde::ser::{Serialize, SerializeSeq, Serializer};

    impl Serialize for PatchCode {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_u8(*self as u8)
        }
    }

    /// Compact list form: `[opcode, key, ...payload]`.
    impl Serialize for Patch {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                Patch::ReplaceNode { key, node } => {
                    let mut seq = serializer.serialize_seq(Some(3))?;
                    seq.serialize_element(&self.code())?;
                    seq.serialize_element(key)?;
                    seq.serialize_element(node.as_ref())?;
                    seq.end()
                }
                Patch::RemoveNode { key } => {
                    let mut seq = serializer.serialize_seq(Some(2))?;
                    seq.serialize_element(&self.code())?;
                    seq.serialize_element(key)?;
                    seq.end()
                }
                Patch::InsertNode {
                    parent,
                    index,
                    node,
                } => {
                    let mut seq = serializer.serialize_seq(Some(3))?;
                    seq.serialize_element(&self.code())?;
                    seq.serialize_element(parent)?;
                    seq.serialize_element(&(index, node.as_ref()))?;
                    seq.end()
                }
                Patch::AlterText { key, text } => {
                    let mut seq = serializer.serialize_seq(Some(3))?;
                    seq.serialize_element(&self.code())?;
                    seq.serialize_element(key)?;
                    seq.serialize_element(text)?;
                    seq.end()
                }
                Patch::ReplaceProps { key, props } => {
                    let mut seq = serializer.serialize_seq(Some(3))?;
                    seq.serialize_element(&self.code())?;
                    seq.serialize_element(key)?;
                    seq.serialize_element(props)?;
                    seq.end()
                }
                Patch::ReplaceStyle { key, style } => {
                    let mut seq = serializer.serialize_seq(Some(3))?;
                    seq.serialize_element(&self.code())?;
                    seq.serialize_element(key)?;
                    seq.serialize_element(style)?;
                    seq.end()
                }
            }
        }
    }
}
