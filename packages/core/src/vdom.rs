//! Immutable virtual-DOM snapshots of the component tree.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::tree::ComponentId;

/// An immutable snapshot of one component, optimized for fast diffing and
/// minimal patch generation.
///
/// `key` equals the component UID at snapshot time. Props and style are
/// copied out of the live stores so later mutations cannot leak into the
/// snapshot. Children are shared behind `Arc` so cached subtrees are reused
/// across snapshots without copying.
#[derive(Debug, Clone, PartialEq)]
pub struct VNode {
    pub tag: String,
    pub key: String,
    pub props: IndexMap<String, String>,
    pub style: IndexMap<String, String>,
    /// Inner text; `None` for leaf elements.
    pub text: Option<String>,
    pub children: Vec<Arc<VNode>>,
    /// Back-reference to the originating component. A lookup aid only: it is
    /// never serialized and never followed during diffing.
    pub component: ComponentId,
}

impl VNode {
    pub fn child(&self, index: usize) -> Option<&VNode> {
        self.children.get(index).map(Arc::as_ref)
    }

    /// Total node count of this subtree, including self.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(|c| c.size()).sum::<usize>()
    }
}

#[cfg(feature = "serialize")]
mod serialize {
    use super::VNode;
    use serde::ser::{Serialize, SerializeSeq, Serializer};

    /// Compact list form: `[tag, key, props, style, text, [children...]]`.
    impl Serialize for VNode {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(6))?;
            seq.serialize_element(&self.tag)?;
            seq.serialize_element(&self.key)?;
            seq.serialize_element(&self.props)?;
            seq.serialize_element(&self.style)?;
            seq.serialize_element(&self.text)?;
            seq.serialize_element(&ChildSeq(&self.children))?;
            seq.end()
        }
    }

    struct ChildSeq<'a>(&'a [std::sync::Arc<VNode>]);

    impl Serialize for ChildSeq<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
            for child in self.0 {
                seq.serialize_element(child.as_ref())?;
            }
            seq.end()
        }
    }
}
