//! Handler-returned directives that force targeted patches regardless of the
//! diff outcome. Useful for components the client mutated through JS: the
//! server state wins.

use crate::diff::Patch;
use crate::error::{ComponentError, ForceUpdateError};
use crate::tree::{ComponentId, Tree};

/// What to regenerate on the target component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Props,
    Style,
    /// Same as [`UpdateKind::InnerHtml`].
    Text,
    InnerHtml,
    /// Expands to props + style (+ text for inner components). Cannot be
    /// combined with other kinds.
    All,
}

/// A validated force-update descriptor returned from an event handler.
///
/// Force updates are limited to components already mounted in the tree; they
/// cannot add or remove components.
#[derive(Debug, Clone)]
pub struct ForceUpdate {
    component: ComponentId,
    updates: Vec<UpdateKind>,
}

impl ForceUpdate {
    pub fn new(
        tree: &Tree,
        component: ComponentId,
        updates: Vec<UpdateKind>,
    ) -> Result<Self, ComponentError> {
        let node = tree.get(component)?;
        if tree.parent_of(component).is_none() {
            return Err(ForceUpdateError::RootTarget.into());
        }
        if updates.contains(&UpdateKind::All) && updates.len() > 1 {
            return Err(ForceUpdateError::RedundantAll.into());
        }
        if updates.contains(&UpdateKind::Text) && updates.contains(&UpdateKind::InnerHtml) {
            return Err(ForceUpdateError::RedundantText.into());
        }
        let wants_text = updates
            .iter()
            .any(|u| matches!(u, UpdateKind::Text | UpdateKind::InnerHtml));
        if wants_text && !node.accept_inner_html() {
            return Err(ForceUpdateError::NoInnerHtml.into());
        }
        Ok(Self { component, updates })
    }

    pub fn component(&self) -> ComponentId {
        self.component
    }

    pub fn updates(&self) -> &[UpdateKind] {
        &self.updates
    }

    /// Generate the targeted patches from the component's current state.
    pub fn generate_patches(&self, tree: &mut Tree) -> Result<Vec<Patch>, ComponentError> {
        tree.sync_data_props(self.component)?;
        let key = tree.require_uid(self.component)?.to_string();
        let node = tree.get(self.component)?;

        let kinds: Vec<UpdateKind> = if self.updates.contains(&UpdateKind::All) {
            if node.accept_inner_html() {
                vec![UpdateKind::Props, UpdateKind::Style, UpdateKind::InnerHtml]
            } else {
                vec![UpdateKind::Props, UpdateKind::Style]
            }
        } else {
            self.updates.clone()
        };

        let mut patches = Vec::with_capacity(kinds.len());
        for kind in kinds {
            match kind {
                UpdateKind::Text | UpdateKind::InnerHtml => patches.push(Patch::AlterText {
                    key: key.clone(),
                    text: Some(node.inner_text().to_string()),
                }),
                UpdateKind::Props => patches.push(Patch::ReplaceProps {
                    key: key.clone(),
                    props: node.props().to_map(),
                }),
                UpdateKind::Style => patches.push(Patch::ReplaceStyle {
                    key: key.clone(),
                    style: node.style().to_map(),
                }),
                UpdateKind::All => unreachable!("expanded above"),
            }
        }
        Ok(patches)
    }
}
