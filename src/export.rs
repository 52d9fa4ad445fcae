//! Project import and export.
//!
//! Two surfaces: a full-project JSON dump (the persistence and sharing
//! format) and a flattened Markdown export that walks the tree
//! depth-first. JSON import is all-or-nothing: a malformed dump yields a
//! single error and no partially loaded project.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write;

use crate::{
    error::MindGraphError,
    graph::GraphStore,
    projection::{scan_headings, TocItem},
    properties::{Edge, Nid, Node},
};

/// A node as it appears in a project dump: the stored record plus its
/// freshly projected table of contents. The TOC is derived on export and
/// ignored on import, `contentMd` is the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDump {
    #[serde(flatten)]
    pub node: Node,
    #[serde(default)]
    pub toc: Vec<TocItem>,
}

impl From<Node> for NodeDump {
    fn from(node: Node) -> Self {
        let toc = scan_headings(&node.content_md);
        NodeDump { node, toc }
    }
}

/// The full-project interchange shape. `settings` and `metadata` are
/// opaque application blobs carried through unmodified.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectDump {
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<Edge>,
    pub settings: serde_json::Value,
    pub metadata: serde_json::Value,
}

impl ProjectDump {
    /// Snapshot a store into the interchange shape.
    pub fn from_store(store: &GraphStore) -> ProjectDump {
        ProjectDump {
            nodes: store.nodes().cloned().map(NodeDump::from).collect(),
            edges: store.edges().cloned().collect(),
            settings: serde_json::Value::Null,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn to_json(&self) -> Result<String, MindGraphError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a dump. Any structural error fails the whole import.
    pub fn from_json(raw: &str) -> Result<ProjectDump, MindGraphError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Materialize into a store, normalizing edges: edges referencing
    /// missing nodes are dropped with a warning, never repaired. Returns
    /// the store and the dropped-edge count.
    pub fn into_store(self) -> (GraphStore, usize) {
        let nodes = self.nodes.into_iter().map(|dump| dump.node).collect();
        GraphStore::from_parts(nodes, self.edges)
    }
}

/// Flatten the whole project into one Markdown document.
///
/// Walks nodes depth-first from the roots following `parent_id`, each
/// node's theme becoming a heading whose level is its depth clamped to
/// `[2, 6]`, followed by the node's content body. Cycle-guarded like the
/// store's own tree walks.
pub fn export_markdown(store: &GraphStore) -> String {
    let mut out = String::new();
    let mut visited = BTreeSet::new();
    for root in store.roots() {
        write_node(store, root.id, 0, &mut out, &mut visited);
    }
    out
}

fn write_node(
    store: &GraphStore,
    id: Nid,
    depth: usize,
    out: &mut String,
    visited: &mut BTreeSet<Nid>,
) {
    if !visited.insert(id) {
        return;
    }
    let Some(node) = store.node(id) else {
        return;
    };
    let level = (depth + 2).clamp(2, 6);
    if !out.is_empty() {
        out.push('\n');
    }
    let _ = writeln!(out, "{} {}", "#".repeat(level), node.theme);
    let body = node.content_md.trim();
    if !body.is_empty() {
        out.push('\n');
        out.push_str(body);
        out.push('\n');
    }
    // Tree export follows exclusive parentage only; edge-only children
    // would otherwise be emitted under several parents.
    let mut child_ids: Vec<Nid> = store
        .nodes()
        .filter(|child| child.parent_id == Some(id))
        .map(|child| child.id)
        .collect();
    child_ids.sort_by_key(|child| {
        store
            .node(*child)
            .map(|n| (n.metadata.created_at, n.id))
            .unwrap_or((i64::MAX, *child))
    });
    for child in child_ids {
        write_node(store, child, depth + 1, out, visited);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodePatch;
    use crate::properties::Position;

    fn seeded_store() -> (GraphStore, Nid, Nid) {
        let mut store = GraphStore::new();
        let root = store
            .add_node(
                Node::new(Nid::new(), "Project root").with_content("# Intro\nIntro body\n"),
            )
            .expect("root");
        let child = store
            .add_node(
                Node::new(Nid::new(), "Chapter one")
                    .with_parent(root)
                    .with_content("Chapter body\n"),
            )
            .expect("child");
        store
            .add_edge(Edge::link(Nid::new(), root, child))
            .expect("edge");
        (store, root, child)
    }

    #[test_log::test]
    fn json_round_trip_preserves_graph() {
        let (store, root, child) = seeded_store();
        let json = ProjectDump::from_store(&store).to_json().expect("dump");
        let dump = ProjectDump::from_json(&json).expect("parse");
        let (restored, dropped) = dump.into_store();
        assert_eq!(dropped, 0);
        assert_eq!(restored.node_count(), 2);
        assert_eq!(restored.edge_count(), 1);
        assert_eq!(restored.node(child).expect("child").parent_id, Some(root));
        assert_eq!(
            restored.node(root).expect("root").content_md,
            "# Intro\nIntro body\n"
        );
    }

    #[test_log::test]
    fn dump_carries_projected_toc() {
        let (store, ..) = seeded_store();
        let dump = ProjectDump::from_store(&store);
        let root_dump = dump
            .nodes
            .iter()
            .find(|d| d.node.theme == "Project root")
            .expect("root dump");
        assert_eq!(root_dump.toc.len(), 1);
        assert_eq!(root_dump.toc[0].text, "Intro");
    }

    #[test_log::test]
    fn import_is_all_or_nothing() {
        assert!(ProjectDump::from_json("{\"nodes\": [{\"broken\": ").is_err());
    }

    #[test_log::test]
    fn import_drops_dangling_edges() {
        let (store, root, _child) = seeded_store();
        let mut dump = ProjectDump::from_store(&store);
        dump.edges.push(Edge::link(Nid::new(), root, Nid::new()));
        let (restored, dropped) = dump.into_store();
        assert_eq!(dropped, 1);
        assert_eq!(restored.edge_count(), 1);
    }

    #[test_log::test]
    fn markdown_export_clamps_heading_depth() {
        let mut store = GraphStore::new();
        let project = Nid::new();
        let mut parent = store
            .add_node(Node::new(project, "Level 0").with_content("top\n"))
            .expect("root");
        // Build a chain deep enough to hit the clamp.
        for depth in 1..=6 {
            parent = store
                .add_node(Node::new(project, format!("Level {depth}")).with_parent(parent))
                .expect("chain node");
        }
        let md = export_markdown(&store);
        assert!(md.starts_with("## Level 0\n\ntop\n"));
        assert!(md.contains("\n### Level 1\n"));
        assert!(md.contains("\n###### Level 4\n"));
        // Depths past the clamp stay at six hashes.
        assert!(md.contains("\n###### Level 6\n"));
        assert!(!md.contains("#######"));
    }

    #[test_log::test]
    fn markdown_export_orders_siblings_by_creation() {
        let mut store = GraphStore::new();
        let project = Nid::new();
        let root = store
            .add_node(Node::new(project, "Root"))
            .expect("root");
        let first = store
            .add_node(Node::new(project, "First").with_parent(root))
            .expect("first");
        let second = store
            .add_node(Node::new(project, "Second").with_parent(root))
            .expect("second");
        // Force distinct creation stamps regardless of clock resolution.
        store
            .update_node(
                first,
                NodePatch {
                    position: Some(Position::new(0.0, 0.0)),
                    ..Default::default()
                },
            )
            .expect("touch first");
        let mut node = store.node(second).expect("second").clone();
        node.metadata.created_at = store.node(first).expect("first").metadata.created_at + 1;
        store.delete_node(second).expect("remove");
        store.add_node(node).expect("re-add");

        let md = export_markdown(&store);
        let first_at = md.find("### First").expect("first heading");
        let second_at = md.find("### Second").expect("second heading");
        assert!(first_at < second_at);
    }
}
