//! Neighborhood assembly for generation requests.
//!
//! Bundles a node's parent, siblings and children into a
//! [`ContextPayload`] that an external generation collaborator consumes.
//! Pure data assembly over [`GraphStore`] queries, no side effects.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::properties::{Nid, Node};

use super::GraphStore;

/// Condensed view of one neighboring node. Content bodies are deliberately
/// excluded, the collaborator works from themes and summaries only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborSummary {
    pub id: Nid,
    pub theme: String,
    pub summary: String,
}

impl From<&Node> for NeighborSummary {
    fn from(node: &Node) -> Self {
        NeighborSummary {
            id: node.id,
            theme: node.theme.clone(),
            summary: node.summary.clone(),
        }
    }
}

/// The wire shape handed to the generation collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_tree: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_node: Option<NeighborSummary>,
    pub sibling_nodes: Vec<NeighborSummary>,
    pub child_nodes: Vec<NeighborSummary>,
}

impl ContextPayload {
    /// Gather the neighborhood of `id` from the store. Children come from
    /// [`GraphStore::children`] (the parent-or-edge union); an unknown id
    /// yields an empty payload rather than an error, the collaborator can
    /// still work from `visible_text` alone.
    pub fn assemble(store: &GraphStore, id: Nid, visible_text: Option<String>) -> ContextPayload {
        ContextPayload {
            visible_text,
            node_tree: None,
            parent_node: store.parent(id).map(NeighborSummary::from),
            sibling_nodes: store
                .siblings(id)
                .into_iter()
                .map(NeighborSummary::from)
                .collect(),
            child_nodes: store
                .children(id)
                .into_iter()
                .map(NeighborSummary::from)
                .collect(),
        }
    }

    /// Attach a pre-rendered outline of the whole tree.
    pub fn with_node_tree(mut self, tree: String) -> ContextPayload {
        self.node_tree = Some(tree);
        self
    }

    /// Flatten into a prompt-ready text block, one neighbor per line with
    /// a role tag.
    pub fn as_prompt_block(&self) -> String {
        let mut out = String::new();
        if let Some(parent) = &self.parent_node {
            push_line(&mut out, "父", parent);
        }
        for sibling in &self.sibling_nodes {
            push_line(&mut out, "兄弟", sibling);
        }
        for child in &self.child_nodes {
            push_line(&mut out, "子", child);
        }
        if let Some(tree) = &self.node_tree {
            if !tree.is_empty() {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(tree);
                out.push('\n');
            }
        }
        if let Some(visible) = &self.visible_text {
            if !visible.is_empty() {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(visible);
                out.push('\n');
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.visible_text.is_none()
            && self.node_tree.is_none()
            && self.parent_node.is_none()
            && self.sibling_nodes.is_empty()
            && self.child_nodes.is_empty()
    }
}

fn push_line(out: &mut String, role: &str, neighbor: &NeighborSummary) {
    if neighbor.summary.is_empty() {
        let _ = writeln!(out, "[{role}] {}", neighbor.theme);
    } else {
        let _ = writeln!(out, "[{role}] {}: {}", neighbor.theme, neighbor.summary);
    }
}
