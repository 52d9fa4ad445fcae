//! Basic building blocks for assembling and manipulating document-graph
//! stores: node and edge records, range-anchored annotations, and embedded
//! animation links.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    time::{SystemTime, UNIX_EPOCH},
};

pub use uuid::Uuid;

use crate::{error::MindGraphError, range::CharRange};

/// Node ID
///
/// A v4 UUID newtype identifying nodes and edges within a project. Entities
/// are always referenced by `Nid`, never by direct pointer, so stores can be
/// snapshotted and rebuilt freely.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Nid(Uuid);

impl Nid {
    pub fn new() -> Self {
        Nid(Uuid::new_v4())
    }

    /// Use a [Nid::nil] when generating temporary ids in order to identify
    /// that the item has no known source context.
    pub fn nil() -> Self {
        Nid(Uuid::nil())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for Nid {
    fn default() -> Self {
        Nid::new()
    }
}

impl AsRef<Uuid> for Nid {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for Nid {
    fn from(id: Uuid) -> Self {
        Nid(id)
    }
}

impl TryFrom<&str> for Nid {
    type Error = MindGraphError;

    fn try_from(string: &str) -> Result<Self, Self::Error> {
        Ok(Nid(Uuid::parse_str(string)?))
    }
}

impl Display for Nid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.0.hyphenated().encode_lower(&mut Uuid::encode_buffer())
        )
    }
}

impl From<&Nid> for String {
    fn from(val: &Nid) -> Self {
        format!("{val}")
    }
}

/// Current wall-clock time as epoch milliseconds. Used for node metadata
/// and annotation timestamps.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Lifecycle status of a node's asynchronously generated content.
///
/// Transitions are `Idle -> Generating -> {Completed | Error}`. The
/// transition into `Generating` is applied synchronously and optimistically
/// before any asynchronous work starts; terminal transitions are
/// last-write-wins (see [`crate::graph::GraphStore::begin_generation`]).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    #[default]
    Idle,
    Generating,
    Completed,
    Error,
}

impl Display for GenerationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            GenerationStatus::Idle => "idle",
            GenerationStatus::Generating => "generating",
            GenerationStatus::Completed => "completed",
            GenerationStatus::Error => "error",
        };
        write!(f, "{label}")
    }
}

/// Canvas position of a node. Unit-less; the renderer decides scale.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }
}

/// Bookkeeping metadata carried by every node. `version` is a monotonically
/// increasing counter bumped on every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    pub created_at: i64,
    pub updated_at: i64,
    pub version: u64,
}

impl Default for NodeMetadata {
    fn default() -> Self {
        let now = now_ms();
        NodeMetadata {
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }
}

/// Semantic style of an annotation. Legacy records may carry an unknown or
/// missing `type`; those deserialize to `None` and render as a plain comment
/// style rather than being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Highlight,
    Comment,
    Note,
    Favorite,
}

mod lenient_kind {
    //! Tolerant deserializer for `Annotation.type`: malformed values become
    //! `None` instead of failing the whole record.
    use super::AnnotationKind;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(
        kind: &Option<AnnotationKind>,
        ser: S,
    ) -> Result<S::Ok, S::Error> {
        match kind {
            Some(k) => ser.serialize_some(k),
            None => ser.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<Option<AnnotationKind>, D::Error> {
        let raw = Option::<serde_json::Value>::deserialize(de)?;
        Ok(raw.and_then(|v| serde_json::from_value::<AnnotationKind>(v).ok()))
    }
}

/// User-authored metadata anchored to a character range of a node's content.
///
/// `range` follows the [`CharRange`] contract against the node's
/// `content_md`. Records missing a range fall back to a first-occurrence
/// text search at overlay time (see [`crate::overlay`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<CharRange>,
    /// The annotation body (a comment's note, or the highlighted text).
    pub text: String,
    /// The exact document text the annotation was anchored to, kept for the
    /// text-search fallback when `range` is absent or stale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    pub author: String,
    pub timestamp: i64,
    #[serde(rename = "type", default, with = "lenient_kind")]
    pub kind: Option<AnnotationKind>,
}

impl Annotation {
    pub fn new(text: impl Into<String>, author: impl Into<String>) -> Self {
        Annotation {
            id: Nid::new().to_string(),
            range: None,
            text: text.into(),
            original_text: None,
            author: author.into(),
            timestamp: now_ms(),
            kind: None,
        }
    }

    pub fn with_range(mut self, range: CharRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_kind(mut self, kind: AnnotationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// The text used by the overlay fallback search: the anchored document
    /// text when recorded, otherwise the annotation body itself.
    pub fn anchor_text(&self) -> &str {
        self.original_text.as_deref().unwrap_or(&self.text)
    }
}

/// An embedded interactive-animation link, anchored to a character range of
/// a node's content and carrying its own generation status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animation {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<CharRange>,
    #[serde(default)]
    pub status: GenerationStatus,
}

/// A unit of knowledge content: one Markdown document plus its annotations,
/// animations, and canvas position.
///
/// Graph shape is expressed twice: by `parent_id` (exclusive tree
/// parentage) and by [`Edge`] records (a possibly denser graph). Tree
/// algorithms (depth, siblings, layout, export) follow `parent_id`
/// canonically; child queries union both relations. See
/// [`crate::graph::GraphStore::children`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: Nid,
    pub project_id: Nid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Nid>,
    pub theme: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content_md: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub favorites: bool,
    #[serde(default)]
    pub animations: Vec<Animation>,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub metadata: NodeMetadata,
    #[serde(default)]
    pub status: GenerationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
}

impl Node {
    /// A fresh node under `project_id` with the given theme. Content starts
    /// empty and status idle; generation requests flip it to generating.
    pub fn new(project_id: Nid, theme: impl Into<String>) -> Self {
        Node {
            id: Nid::new(),
            project_id,
            parent_id: None,
            theme: theme.into(),
            summary: String::new(),
            content_md: String::new(),
            annotations: Vec::new(),
            favorites: false,
            animations: Vec::new(),
            position: Position::default(),
            metadata: NodeMetadata::default(),
            status: GenerationStatus::Idle,
            progress: None,
        }
    }

    pub fn with_parent(mut self, parent_id: Nid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_content(mut self, content_md: impl Into<String>) -> Self {
        self.content_md = content_md.into();
        self
    }

    /// Char length of the node's content, the bound all annotation ranges
    /// are validated against.
    pub fn content_len(&self) -> usize {
        self.content_md.chars().count()
    }

    pub(crate) fn touch(&mut self) {
        self.metadata.updated_at = now_ms();
        self.metadata.version += 1;
    }
}

/// The top/bottom attachment point of an edge on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeAnchor {
    Top,
    Bottom,
}

/// Optional semantic metadata carried by an edge.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeMeta {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A directed connection between two nodes, independent of tree parentage.
///
/// Invariant: both endpoints must reference existing nodes. Violating edges
/// are dropped during load/normalization, never silently repaired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: Nid,
    pub project_id: Nid,
    pub from_node_id: Nid,
    pub to_node_id: Nid,
    pub from_anchor: EdgeAnchor,
    pub to_anchor: EdgeAnchor,
    #[serde(default)]
    pub meta: EdgeMeta,
}

impl Edge {
    /// A parent-to-child style link: leaves the source's bottom anchor and
    /// enters the target's top anchor.
    pub fn link(project_id: Nid, from: Nid, to: Nid) -> Self {
        Edge {
            id: Nid::new(),
            project_id,
            from_node_id: from,
            to_node_id: to,
            from_anchor: EdgeAnchor::Bottom,
            to_anchor: EdgeAnchor::Top,
            meta: EdgeMeta::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nid_round_trip() {
        let nid = Nid::new();
        let parsed = Nid::try_from(nid.to_string().as_str()).unwrap();
        assert_eq!(nid, parsed);
        assert!(Nid::try_from("not-a-uuid").is_err());
        assert!(Nid::nil().is_nil());
    }

    #[test]
    fn test_annotation_wire_names() {
        let ann = Annotation {
            id: "a1".to_string(),
            range: Some(CharRange::new(2, 5)),
            text: "note".to_string(),
            original_text: Some("source".to_string()),
            author: "user".to_string(),
            timestamp: 1000,
            kind: Some(AnnotationKind::Highlight),
        };
        let json = serde_json::to_value(&ann).unwrap();
        assert_eq!(json["range"]["start"], 2);
        assert_eq!(json["originalText"], "source");
        assert_eq!(json["type"], "highlight");
    }

    #[test]
    fn test_annotation_malformed_type_kept() {
        // An unknown `type` must not reject the record.
        let ann: Annotation = serde_json::from_str(
            r#"{"id":"a1","text":"t","author":"u","timestamp":0,"type":"sparkle"}"#,
        )
        .unwrap();
        assert_eq!(ann.kind, None);
        assert_eq!(ann.range, None);
    }

    #[test]
    fn test_node_wire_names() {
        let node = Node::new(Nid::new(), "Theme").with_content("# Doc");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["contentMd"], "# Doc");
        assert_eq!(json["status"], "idle");
        assert_eq!(json["metadata"]["version"], 1);
        assert!(json.get("parentId").is_none());
    }

    #[test]
    fn test_edge_wire_names() {
        let project = Nid::new();
        let edge = Edge::link(project, Nid::new(), Nid::new());
        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json["fromAnchor"], "bottom");
        assert_eq!(json["toAnchor"], "top");
        assert!(json["meta"].get("type").is_none());
    }
}
