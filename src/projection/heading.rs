//! Fence-aware heading extraction and the projections derived from it.
//!
//! No full Markdown parser is involved: a line scan detects ATX headings
//! (levels 1-4) while skipping the interior of fenced code blocks. One pass
//! over the detected headings produces both the flat table of contents and
//! the mind-map parent-pointer tree, O(n) in heading count.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Deepest heading level projected into the TOC/mind-map.
pub const MAX_HEADING_LEVEL: u8 = 4;

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,4})\s+(.+)$").expect("heading regex is valid"));

static WHITESPACE_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// One table-of-contents entry. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TocItem {
    /// Heading level, 1-4.
    pub level: u8,
    pub text: String,
    /// Stable slug of the form `h{level}-{slugified-text}`.
    pub anchor: String,
    /// 0-based source line index of the heading in the document.
    pub line: usize,
}

/// A mind-map tree node. The tree is rooted at a synthetic root
/// representing pre-heading content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindMapNode {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindMapEdge {
    pub id: String,
    pub from: String,
    pub to: String,
}

/// The mind-map projection: a parent-pointer tree over the document's
/// headings, plus explicit edges for renderers that want them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MindMap {
    pub root: String,
    pub nodes: Vec<MindMapNode>,
    pub edges: Vec<MindMapEdge>,
}

impl MindMap {
    pub fn node(&self, id: &str) -> Option<&MindMapNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Both heading-derived views of one document, computed in a single pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentProjection {
    pub toc: Vec<TocItem>,
    pub mindmap: MindMap,
}

/// Compute the stable anchor slug for a heading: lowercase the text,
/// collapse whitespace runs to hyphens, and prefix with `h{level}-`.
pub fn heading_anchor(level: u8, text: &str) -> String {
    let slug = WHITESPACE_RUN_RE.replace_all(text.trim(), "-").to_lowercase();
    format!("h{level}-{slug}")
}

/// Scan `text` for headings, skipping fenced code blocks.
///
/// A line whose trimmed form starts with three backticks toggles fence
/// state; while inside a fence no heading detection happens. Headings with
/// empty text are skipped.
pub fn scan_headings(text: &str) -> Vec<TocItem> {
    let mut toc = Vec::new();
    let mut in_fence = false;
    for (line_idx, line) in text.lines().enumerate() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        let Some(caps) = HEADING_RE.captures(line) else {
            continue;
        };
        let level = caps[1].len() as u8;
        let heading_text = caps[2].trim();
        if heading_text.is_empty() {
            continue;
        }
        toc.push(TocItem {
            level,
            text: heading_text.to_string(),
            anchor: heading_anchor(level, heading_text),
            line: line_idx,
        });
    }
    toc
}

/// Synthetic root text: the first non-empty line before the first heading,
/// so the mind-map root gives a hint of the document's preamble.
fn root_text(text: &str, first_heading_line: Option<usize>) -> String {
    text.lines()
        .take(first_heading_line.unwrap_or(usize::MAX))
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim().to_string())
        .unwrap_or_default()
}

/// Derive the table of contents and mind-map tree for `text`.
///
/// Hierarchy construction is stack-based: the stack is seeded with a
/// synthetic root at level 0, and for each heading in document order the
/// stack is popped while its top has `level >= current`, so each heading
/// attaches to the nearest strictly shallower ancestor. Ties at equal
/// level become siblings, not children.
pub fn build_projections(text: &str) -> DocumentProjection {
    let toc = scan_headings(text);

    let mut nodes = vec![MindMapNode {
        id: "root".to_string(),
        text: root_text(text, toc.first().map(|item| item.line)),
        parent_id: None,
        children: Vec::new(),
    }];
    let mut edges = Vec::new();
    // (level, index into nodes)
    let mut stack: Vec<(u8, usize)> = vec![(0, 0)];

    for item in &toc {
        while stack
            .last()
            .map(|(level, _)| *level >= item.level)
            .unwrap_or(false)
        {
            stack.pop();
        }
        let &(_, parent_idx) = stack.last().unwrap_or(&(0, 0));
        let parent_id = nodes[parent_idx].id.clone();

        // Duplicate headings share an anchor; suffix repeats to keep the
        // mind-map ids unique.
        let mut id = item.anchor.clone();
        let mut suffix = 2;
        while nodes.iter().any(|n| n.id == id) {
            id = format!("{}-{suffix}", item.anchor);
            suffix += 1;
        }

        let node_idx = nodes.len();
        nodes.push(MindMapNode {
            id: id.clone(),
            text: item.text.clone(),
            parent_id: Some(parent_id.clone()),
            children: Vec::new(),
        });
        nodes[parent_idx].children.push(id.clone());
        edges.push(MindMapEdge {
            id: format!("e-{parent_id}-{id}"),
            from: parent_id,
            to: id,
        });
        stack.push((item.level, node_idx));
    }

    DocumentProjection {
        toc,
        mindmap: MindMap {
            root: "root".to_string(),
            nodes,
            edges,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_consistency() {
        // H1 A / H2 B / H2 C: root has no parent, A's parent is root,
        // B and C attach to A, TOC length 3.
        let text = "# A\n## B\ncontent\n## C\n";
        let projection = build_projections(text);
        assert_eq!(projection.toc.len(), 3);

        let mindmap = &projection.mindmap;
        let root = mindmap.node("root").unwrap();
        assert_eq!(root.parent_id, None);
        let a = mindmap.node("h1-a").unwrap();
        assert_eq!(a.parent_id.as_deref(), Some("root"));
        let b = mindmap.node("h2-b").unwrap();
        let c = mindmap.node("h2-c").unwrap();
        assert_eq!(b.parent_id.as_deref(), Some("h1-a"));
        assert_eq!(c.parent_id.as_deref(), Some("h1-a"));
        assert_eq!(a.children, vec!["h2-b".to_string(), "h2-c".to_string()]);
    }

    #[test]
    fn test_fence_awareness() {
        let text = "# Real\n```\n### not a heading\n```\n## Also real\n";
        let toc = scan_headings(text);
        assert_eq!(toc.len(), 2);
        assert_eq!(toc[0].text, "Real");
        assert_eq!(toc[1].text, "Also real");
    }

    #[test]
    fn test_unclosed_fence_suppresses_rest() {
        let text = "# Real\n```rust\n# shadowed\n";
        let toc = scan_headings(text);
        assert_eq!(toc.len(), 1);
    }

    #[test]
    fn test_levels_beyond_four_ignored() {
        let text = "#### Deep\n##### Too deep\n";
        let toc = scan_headings(text);
        assert_eq!(toc.len(), 1);
        assert_eq!(toc[0].level, 4);
        assert_eq!(toc[0].anchor, "h4-deep");
    }

    #[test]
    fn test_empty_heading_text_skipped() {
        let toc = scan_headings("#   \n# Ok\n");
        assert_eq!(toc.len(), 1);
        assert_eq!(toc[0].text, "Ok");
    }

    #[test]
    fn test_anchor_slugging() {
        assert_eq!(heading_anchor(2, "Hello World"), "h2-hello-world");
        assert_eq!(heading_anchor(1, "  Spaced   Out  "), "h1-spaced-out");
        assert_eq!(heading_anchor(3, "混合 Title"), "h3-混合-title");
    }

    #[test]
    fn test_equal_levels_become_siblings() {
        let text = "## First\n## Second\n## Third\n";
        let projection = build_projections(text);
        let root = projection.mindmap.node("root").unwrap();
        assert_eq!(root.children.len(), 3);
    }

    #[test]
    fn test_skip_level_attaches_to_nearest_shallower() {
        // H1 then H3: H3 still attaches to the H1 even though H2 is absent.
        let text = "# Top\n### Deep\n";
        let projection = build_projections(text);
        let deep = projection.mindmap.node("h3-deep").unwrap();
        assert_eq!(deep.parent_id.as_deref(), Some("h1-top"));
    }

    #[test]
    fn test_duplicate_headings_get_unique_ids() {
        let text = "# Same\n# Same\n";
        let projection = build_projections(text);
        assert!(projection.mindmap.node("h1-same").is_some());
        assert!(projection.mindmap.node("h1-same-2").is_some());
    }

    #[test]
    fn test_root_text_from_preamble() {
        let projection = build_projections("intro line\n\n# A\n");
        assert_eq!(projection.mindmap.node("root").unwrap().text, "intro line");
    }
}
