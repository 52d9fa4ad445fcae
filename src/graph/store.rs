//! The document-graph store.
//!
//! Graph shape is expressed twice: `Node.parent_id` (exclusive tree
//! parentage) and [`Edge`] records (a possibly denser graph). `parent_id`
//! is canonical for tree algorithms (`parent`, `siblings`, `depth`,
//! layout, export); [`GraphStore::children`] is the documented union of
//! both relations. The two views are never reconciled automatically.

use petgraph::{
    stable_graph::{EdgeIndex, NodeIndex, StableDiGraph},
    visit::EdgeRef,
    Direction,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::mpsc::Sender,
};

use crate::{
    error::MindGraphError,
    event::GraphEvent,
    properties::{
        Animation, Annotation, Edge, EdgeAnchor, EdgeMeta, GenerationStatus, Nid, Node, Position,
    },
};

/// Horizontal spacing between sibling nodes in the auto layout.
pub const H_SPACING: f64 = 180.0;
/// Vertical offset per depth level in the auto layout.
pub const V_SPACING: f64 = 140.0;

/// Owned relation graph: node ids as vertices, [`Edge`] records as edge
/// weights. Stable indices so deletions never invalidate the id map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeGraph(pub StableDiGraph<Nid, Edge>);

impl NodeGraph {
    pub fn as_graph(&self) -> &StableDiGraph<Nid, Edge> {
        &self.0
    }

    pub fn as_graph_mut(&mut self) -> &mut StableDiGraph<Nid, Edge> {
        &mut self.0
    }

    fn edge_index(&self, id: Nid) -> Option<EdgeIndex> {
        self.0
            .edge_indices()
            .find(|idx| self.0[*idx].id == id)
    }
}

/// Partial update for [`GraphStore::update_node`]. Absent fields leave the
/// node untouched; `parent_id` and `progress` use nested options so
/// reparenting to root and clearing progress (`Some(None)`) are expressible.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodePatch {
    pub theme: Option<String>,
    pub summary: Option<String>,
    pub content_md: Option<String>,
    pub parent_id: Option<Option<Nid>>,
    pub position: Option<Position>,
    pub favorites: Option<bool>,
    pub progress: Option<Option<f32>>,
    pub annotations: Option<Vec<Annotation>>,
    pub animations: Option<Vec<Animation>>,
}

/// Partial update for [`GraphStore::update_edge`]. Endpoints are
/// immutable; rewire by delete + add.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EdgePatch {
    pub from_anchor: Option<EdgeAnchor>,
    pub to_anchor: Option<EdgeAnchor>,
    pub meta: Option<EdgeMeta>,
}

/// The node set and edge set of one project, with referential invariants
/// enforced on every mutation.
///
/// Single-writer by contract: all mutations happen synchronously inside
/// the owning process's update cycle. Derived projections are pure and may
/// be recomputed on any read without synchronization.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    nodes: BTreeMap<Nid, Node>,
    relations: NodeGraph,
    indices: BTreeMap<Nid, NodeIndex>,
    events: Option<Sender<GraphEvent>>,
}

impl GraphStore {
    pub fn new() -> Self {
        GraphStore::default()
    }

    /// Subscribe an external collaborator (persistence cache, UI) to
    /// mutation events.
    pub fn with_events(mut self, sender: Sender<GraphEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Build a store from loose node and edge lists, dropping edges whose
    /// endpoints are missing (never repairing them). Returns the store and
    /// the number of dropped edges.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> (GraphStore, usize) {
        let mut store = GraphStore::new();
        for node in nodes {
            let id = node.id;
            if store.add_node(node).is_err() {
                tracing::warn!("Duplicate node id {id} in input, keeping the first");
            }
        }
        let mut dropped = 0;
        for edge in edges {
            match store.add_edge(edge) {
                Ok(_) => {}
                Err(MindGraphError::MissingEndpoint(msg)) => {
                    tracing::warn!("Dropping edge with missing endpoint: {msg}");
                    dropped += 1;
                }
                Err(e) => {
                    tracing::warn!("Dropping edge: {e}");
                    dropped += 1;
                }
            }
        }
        (store, dropped)
    }

    fn emit(&self, event: GraphEvent) {
        if let Some(tx) = &self.events {
            if tx.send(event).is_err() {
                tracing::debug!("Graph event subscriber disconnected");
            }
        }
    }

    pub fn node(&self, id: Nid) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge(&self, id: Nid) -> Option<&Edge> {
        self.relations
            .edge_index(id)
            .map(|idx| &self.relations.as_graph()[idx])
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.relations
            .as_graph()
            .edge_indices()
            .map(|idx| &self.relations.as_graph()[idx])
    }

    pub fn edge_count(&self) -> usize {
        self.relations.as_graph().edge_count()
    }

    /// Insert a new node. Duplicate ids are an error; use
    /// [`GraphStore::update_node`] to mutate.
    pub fn add_node(&mut self, node: Node) -> Result<Nid, MindGraphError> {
        let id = node.id;
        if self.nodes.contains_key(&id) {
            return Err(MindGraphError::Graph(format!("node {id} already exists")));
        }
        let idx = self.relations.as_graph_mut().add_node(id);
        self.indices.insert(id, idx);
        self.nodes.insert(id, node);
        self.emit(GraphEvent::NodeAdded(id));
        Ok(id)
    }

    /// Apply a partial update, bumping the node's version counter and
    /// `updated_at` timestamp.
    pub fn update_node(&mut self, id: Nid, patch: NodePatch) -> Result<&Node, MindGraphError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| MindGraphError::NotFound(format!("node {id}")))?;
        if let Some(theme) = patch.theme {
            node.theme = theme;
        }
        if let Some(summary) = patch.summary {
            node.summary = summary;
        }
        if let Some(content_md) = patch.content_md {
            node.content_md = content_md;
        }
        if let Some(parent_id) = patch.parent_id {
            node.parent_id = parent_id;
        }
        if let Some(position) = patch.position {
            node.position = position;
        }
        if let Some(favorites) = patch.favorites {
            node.favorites = favorites;
        }
        if let Some(progress) = patch.progress {
            node.progress = progress;
        }
        if let Some(annotations) = patch.annotations {
            node.annotations = annotations;
        }
        if let Some(animations) = patch.animations {
            node.animations = animations;
        }
        node.touch();
        let version = node.metadata.version;
        self.emit(GraphEvent::NodeUpdated(id, version));
        Ok(self.nodes.get(&id).unwrap_or_else(|| unreachable!()))
    }

    /// Delete a node, cascading removal of every edge where it is source
    /// or target. Other nodes and edges are left untouched. Child nodes
    /// keep their dangling `parent_id` (they become reachable as roots
    /// only after the caller reparents them).
    pub fn delete_node(&mut self, id: Nid) -> Result<Node, MindGraphError> {
        let node = self
            .nodes
            .remove(&id)
            .ok_or_else(|| MindGraphError::NotFound(format!("node {id}")))?;
        let idx = self
            .indices
            .remove(&id)
            .ok_or_else(|| MindGraphError::Graph(format!("node {id} missing graph index")))?;
        // A self-loop shows up in both directions; collect into a set so
        // the removal event carries each edge id once.
        let removed_edges: Vec<Nid> = self
            .relations
            .as_graph()
            .edges_directed(idx, Direction::Outgoing)
            .chain(self.relations.as_graph().edges_directed(idx, Direction::Incoming))
            .map(|edge| edge.weight().id)
            .collect::<BTreeSet<Nid>>()
            .into_iter()
            .collect();
        // StableGraph removes incident edges along with the node.
        self.relations.as_graph_mut().remove_node(idx);
        if !removed_edges.is_empty() {
            self.emit(GraphEvent::EdgesRemoved(removed_edges));
        }
        self.emit(GraphEvent::NodesRemoved(vec![id]));
        Ok(node)
    }

    /// Insert an edge. Both endpoints must reference existing nodes.
    /// Inserting an edge whose id already exists is an idempotent no-op
    /// (returns `Ok(false)`), not an overwrite.
    pub fn add_edge(&mut self, edge: Edge) -> Result<bool, MindGraphError> {
        if self.relations.edge_index(edge.id).is_some() {
            return Ok(false);
        }
        let from_idx = *self.indices.get(&edge.from_node_id).ok_or_else(|| {
            MindGraphError::MissingEndpoint(format!(
                "edge {} from {}",
                edge.id, edge.from_node_id
            ))
        })?;
        let to_idx = *self.indices.get(&edge.to_node_id).ok_or_else(|| {
            MindGraphError::MissingEndpoint(format!("edge {} to {}", edge.id, edge.to_node_id))
        })?;
        let id = edge.id;
        self.relations.as_graph_mut().add_edge(from_idx, to_idx, edge);
        self.emit(GraphEvent::EdgeAdded(id));
        Ok(true)
    }

    pub fn update_edge(&mut self, id: Nid, patch: EdgePatch) -> Result<&Edge, MindGraphError> {
        let idx = self
            .relations
            .edge_index(id)
            .ok_or_else(|| MindGraphError::NotFound(format!("edge {id}")))?;
        let edge = &mut self.relations.as_graph_mut()[idx];
        if let Some(from_anchor) = patch.from_anchor {
            edge.from_anchor = from_anchor;
        }
        if let Some(to_anchor) = patch.to_anchor {
            edge.to_anchor = to_anchor;
        }
        if let Some(meta) = patch.meta {
            edge.meta = meta;
        }
        self.emit(GraphEvent::EdgeUpdated(id));
        Ok(&self.relations.as_graph()[idx])
    }

    pub fn delete_edge(&mut self, id: Nid) -> Result<Edge, MindGraphError> {
        let idx = self
            .relations
            .edge_index(id)
            .ok_or_else(|| MindGraphError::NotFound(format!("edge {id}")))?;
        let edge = self
            .relations
            .as_graph_mut()
            .remove_edge(idx)
            .ok_or_else(|| MindGraphError::Graph(format!("edge {id} vanished")))?;
        self.emit(GraphEvent::EdgesRemoved(vec![id]));
        Ok(edge)
    }

    /// Child ids: nodes whose `parent_id` equals `id`, unioned with nodes
    /// reachable via an outgoing edge, deduplicated by id.
    ///
    /// The union is deliberate: the two relations can diverge (a node may
    /// have edge-children outside its `parent_id` tree) and this query
    /// preserves both views rather than reconciling them. It can therefore
    /// disagree with [`GraphStore::depth`], which follows `parent_id` only.
    pub fn children_ids(&self, id: Nid) -> Vec<Nid> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for node in self.nodes.values() {
            if node.parent_id == Some(id) && seen.insert(node.id) {
                out.push(node.id);
            }
        }
        if let Some(idx) = self.indices.get(&id) {
            for edge in self
                .relations
                .as_graph()
                .edges_directed(*idx, Direction::Outgoing)
            {
                let target = self.relations.as_graph()[edge.target()];
                if seen.insert(target) {
                    out.push(target);
                }
            }
        }
        out
    }

    pub fn children(&self, id: Nid) -> Vec<&Node> {
        self.children_ids(id)
            .into_iter()
            .filter_map(|child| self.nodes.get(&child))
            .collect()
    }

    /// Other nodes sharing the node's `parent_id` (root nodes are mutual
    /// siblings under the shared `None` parent).
    pub fn siblings(&self, id: Nid) -> Vec<&Node> {
        let Some(node) = self.nodes.get(&id) else {
            return Vec::new();
        };
        self.nodes
            .values()
            .filter(|other| other.id != id && other.parent_id == node.parent_id)
            .collect()
    }

    pub fn parent(&self, id: Nid) -> Option<&Node> {
        self.nodes
            .get(&id)
            .and_then(|node| node.parent_id)
            .and_then(|parent_id| self.nodes.get(&parent_id))
    }

    /// Depth of the node along its `parent_id` chain, 0 for roots and
    /// unknown ids. Cycle-guarded: a corrupted parent loop terminates at
    /// the first revisit.
    pub fn depth(&self, id: Nid) -> usize {
        let mut depth = 0;
        let mut visited = BTreeSet::from([id]);
        let mut current = self.nodes.get(&id).and_then(|n| n.parent_id);
        while let Some(parent_id) = current {
            if !visited.insert(parent_id) {
                tracing::warn!("parent_id cycle detected at node {parent_id}");
                break;
            }
            depth += 1;
            current = self.nodes.get(&parent_id).and_then(|n| n.parent_id);
        }
        depth
    }

    /// Nodes with no parent, in id order.
    pub fn roots(&self) -> Vec<&Node> {
        self.nodes
            .values()
            .filter(|node| node.parent_id.is_none())
            .collect()
    }

    /// Optimistic transition into `generating` before any asynchronous
    /// work starts. Re-entering while a generation is already in flight is
    /// a caller error and is rejected rather than silently racing.
    pub fn begin_generation(&mut self, id: Nid) -> Result<(), MindGraphError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| MindGraphError::NotFound(format!("node {id}")))?;
        if node.status == GenerationStatus::Generating {
            return Err(MindGraphError::GenerationInFlight(id.to_string()));
        }
        node.status = GenerationStatus::Generating;
        node.progress = Some(0.0);
        node.touch();
        self.emit(GraphEvent::StatusChanged(id, GenerationStatus::Generating));
        Ok(())
    }

    /// Terminal transition for a resolved generation. Last-write-wins: no
    /// status precondition, so a stale resolution overwrites whatever
    /// state exists at that time.
    pub fn complete_generation(
        &mut self,
        id: Nid,
        content_md: String,
        summary: Option<String>,
    ) -> Result<(), MindGraphError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| MindGraphError::NotFound(format!("node {id}")))?;
        node.content_md = content_md;
        if let Some(summary) = summary {
            node.summary = summary;
        }
        node.status = GenerationStatus::Completed;
        node.progress = None;
        node.touch();
        let version = node.metadata.version;
        self.emit(GraphEvent::StatusChanged(id, GenerationStatus::Completed));
        self.emit(GraphEvent::NodeUpdated(id, version));
        Ok(())
    }

    /// Terminal transition for a failed generation: status becomes
    /// `error`, original content is left untouched (no partial overwrite).
    pub fn fail_generation(&mut self, id: Nid) -> Result<(), MindGraphError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| MindGraphError::NotFound(format!("node {id}")))?;
        node.status = GenerationStatus::Error;
        node.progress = None;
        node.touch();
        self.emit(GraphEvent::StatusChanged(id, GenerationStatus::Error));
        Ok(())
    }

    /// Auto-place `root` and its descendants: root at `origin`, each
    /// node's children spread horizontally centered under the parent with
    /// fixed spacing and a fixed vertical offset per depth level.
    ///
    /// Best-effort convenience for initial placement only; nodes may be
    /// freely dragged afterwards, breaking the tree-shape assumption.
    pub fn layout_tree(&mut self, root: Nid, origin: Position) -> Result<(), MindGraphError> {
        if !self.nodes.contains_key(&root) {
            return Err(MindGraphError::NotFound(format!("node {root}")));
        }
        let mut visited = BTreeSet::new();
        self.place_subtree(root, origin.x, origin.y, &mut visited);
        Ok(())
    }

    fn subtree_width(&self, id: Nid, visited: &mut BTreeSet<Nid>) -> f64 {
        if !visited.insert(id) {
            return 0.0;
        }
        let widths: Vec<f64> = self
            .children_ids(id)
            .into_iter()
            .map(|child| self.subtree_width(child, visited))
            .filter(|w| *w > 0.0)
            .collect();
        if widths.is_empty() {
            H_SPACING
        } else {
            widths.iter().sum()
        }
    }

    fn place_subtree(&mut self, id: Nid, x: f64, y: f64, visited: &mut BTreeSet<Nid>) {
        if !visited.insert(id) {
            return;
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.position = Position::new(x, y);
        }
        let children = self.children_ids(id);
        let mut widths = Vec::with_capacity(children.len());
        {
            // Width measurement must not consume the placement visited set.
            let mut measure_visited = visited.clone();
            for child in &children {
                widths.push(self.subtree_width(*child, &mut measure_visited));
            }
        }
        let total: f64 = widths.iter().sum();
        let mut cursor = x - total / 2.0;
        for (child, width) in children.into_iter().zip(widths) {
            if width <= 0.0 {
                continue;
            }
            self.place_subtree(child, cursor + width / 2.0, y + V_SPACING, visited);
            cursor += width;
        }
    }

    /// Translate a node and all of its positional descendants (computed
    /// via the `children` union) by the same delta.
    pub fn translate_subtree(&mut self, id: Nid, dx: f64, dy: f64) -> Result<(), MindGraphError> {
        if !self.nodes.contains_key(&id) {
            return Err(MindGraphError::NotFound(format!("node {id}")));
        }
        let mut visited = BTreeSet::new();
        let mut queue = vec![id];
        while let Some(current) = queue.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(node) = self.nodes.get_mut(&current) {
                node.position.x += dx;
                node.position.y += dy;
            }
            queue.extend(self.children_ids(current));
        }
        Ok(())
    }
}
