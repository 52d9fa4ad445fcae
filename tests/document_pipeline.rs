//! End-to-end pipeline over one document: store a node, project its
//! headings, render and strip overlays, extract a section with remapped
//! ranges.

use test_log::test;

use mindgraph_core::{
    graph::{ContextPayload, GraphStore},
    overlay::{apply_overlay, render_node, strip_overlay, OverlayEntity},
    projection::{build_projections, decorate, extract_section},
    properties::{Annotation, AnnotationKind, Edge, Nid, Node},
    range::CharRange,
};

const DOC: &str = "\
Preamble line
# A
alpha text
## B
```
### not a heading
```
beta
## C
gamma
";

fn doc_node() -> Node {
    Node::new(Nid::new(), "Pipeline doc").with_content(DOC)
}

#[test]
fn projection_hierarchy_and_fence() {
    let projection = build_projections(DOC);

    assert_eq!(projection.toc.len(), 3);
    let anchors: Vec<&str> = projection.toc.iter().map(|t| t.anchor.as_str()).collect();
    assert_eq!(anchors, vec!["h1-a", "h2-b", "h2-c"]);
    // The fenced pseudo-heading never surfaces.
    assert!(projection.toc.iter().all(|t| !t.text.contains("not a heading")));

    let map = &projection.mindmap;
    let root = map.node(&map.root).expect("root node");
    assert!(root.parent_id.is_none());
    assert_eq!(root.text, "Preamble line");
    assert_eq!(
        map.node("h1-a").expect("a").parent_id.as_deref(),
        Some(map.root.as_str())
    );
    assert_eq!(map.node("h2-b").expect("b").parent_id.as_deref(), Some("h1-a"));
    assert_eq!(map.node("h2-c").expect("c").parent_id.as_deref(), Some("h1-a"));
}

#[test]
fn overlay_round_trip_through_node_render() {
    let mut node = doc_node();
    // "alpha text" starts at char 18 (after "Preamble line\n# A\n").
    node.annotations.push(
        Annotation::new("alpha text", "reader")
            .with_range(CharRange::new(18, 28))
            .with_kind(AnnotationKind::Highlight),
    );
    // No stored range: resolves by first-occurrence search for "gamma".
    node.annotations
        .push(Annotation::new("gamma", "reader").with_kind(AnnotationKind::Comment));

    let rendered = render_node(&node);
    assert!(rendered.contains("class=\"highlight-mark\">alpha text</a>"));
    assert!(rendered.contains("data-annotation-id"));
    assert_eq!(strip_overlay(&rendered), DOC);
}

#[test]
fn adjacent_entities_close_before_open() {
    let text = "alphabeta";
    let a = Annotation::new("x", "t")
        .with_range(CharRange::new(0, 5))
        .with_kind(AnnotationKind::Highlight);
    let b = Annotation::new("y", "t")
        .with_range(CharRange::new(5, 9))
        .with_kind(AnnotationKind::Highlight);
    let entities = vec![
        OverlayEntity::from_annotation(&a),
        OverlayEntity::from_annotation(&b),
    ];

    let marked = apply_overlay(text, &entities);
    // rangeA.end == rangeB.start must never nest: A closes before B opens.
    assert!(marked.contains("alpha</a><a "));
    assert_eq!(strip_overlay(&marked), text);
}

#[test]
fn unresolvable_entities_are_skipped() {
    let mut node = doc_node();
    node.annotations.push(
        Annotation::new("no such text anywhere", "reader")
            .with_kind(AnnotationKind::Highlight),
    );
    node.annotations.push(
        Annotation::new("stale", "reader").with_range(CharRange::new(5000, 5010)),
    );

    // Both drop silently; the document still renders.
    assert_eq!(render_node(&node), DOC);
}

#[test]
fn section_extraction_remaps_annotation() {
    let content = "pre\n# H\nbody";
    let annotation = Annotation::new("body", "reader")
        .with_range(CharRange::new(8, 12))
        .with_kind(AnnotationKind::Comment);

    let projection = build_projections(content);
    let section = extract_section(content, &projection.toc, Some(0)).expect("section");
    assert_eq!(section.text, "# H\nbody");

    let remapped = section.remap_annotations(&[annotation.clone()]);
    assert_eq!(remapped.len(), 1);
    assert_eq!(remapped[0].range, Some(CharRange::new(4, 8)));

    // The remapped range lands on the same characters in the view, and
    // unmapping restores the document offsets.
    let view_range = remapped[0].range.expect("range");
    let chars: String = section
        .text
        .chars()
        .skip(view_range.start)
        .take(view_range.end - view_range.start)
        .collect();
    assert_eq!(chars, "body");
    assert_eq!(
        section.unmap(view_range),
        Some(CharRange::new(8, 12))
    );
}

#[test]
fn decorations_flag_annotated_sections() {
    let mut node = doc_node();
    // "beta" lives in section B (between headings B and C).
    node.annotations.push(
        Annotation::new("beta", "reader").with_kind(AnnotationKind::Favorite),
    );
    let projection = build_projections(&node.content_md);
    let decorations = decorate(
        &node.content_md,
        &projection.toc,
        &node.annotations,
        &node.animations,
    );

    let flags_of = |anchor: &str| {
        decorations
            .iter()
            .find(|d| d.anchor == anchor)
            .expect("decorated")
            .flags
    };
    assert!(flags_of("h2-b").has_favorites);
    assert!(!flags_of("h2-c").has_favorites);
    assert!(!flags_of("h1-a").has_annotations);
}

#[test]
fn store_feeds_context_assembly() {
    let mut store = GraphStore::new();
    let project = Nid::new();
    let root = store
        .add_node(Node::new(project, "Topic").with_content("Overview\n"))
        .expect("root");
    let child = store
        .add_node(doc_node().with_parent(root))
        .expect("child");
    store
        .add_edge(Edge::link(project, root, child))
        .expect("edge");

    let payload = ContextPayload::assemble(&store, child, None);
    assert_eq!(payload.parent_node.expect("parent").theme, "Topic");

    // Cascade: removing the child takes its incident edge along.
    store.delete_node(child).expect("deleted");
    assert_eq!(store.edge_count(), 0);
    assert_eq!(store.node_count(), 1);
}
