//! Overlay rendering: merge range-anchored entities into renderable markup.
//!
//! The engine takes a text buffer plus a set of range-tagged entities
//! (annotations, favorites, animation links) and produces a single markup
//! string with nested open/close regions. Stripping the inserted tags from
//! the output reconstructs the original text exactly, so stale or
//! unresolvable entities can always be skipped without corrupting the
//! document.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    properties::{Animation, Annotation, AnnotationKind, Node},
    range::{char_byte_offsets, locate_by_text, CharRange},
};

/// Rendering vocabulary for an overlay region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    /// A distinct inline wrapper, rendered as a hyperlink-like anchor token.
    Highlight,
    /// An inline span carrying the annotation's note as a tooltip payload.
    /// Untyped and `note` annotations render with this style too.
    Comment,
    /// An inline span with a stable DOM id, so favorites can be scrolled to.
    Favorite,
    /// An inline span carrying the animation id and its generation status.
    AnimationLink,
}

/// One renderable entity: a character range plus the data its tags embed.
#[derive(Debug, Clone)]
pub struct OverlayEntity {
    pub id: String,
    pub range: Option<CharRange>,
    pub kind: OverlayKind,
    /// Document text the entity was anchored to; used for the fallback
    /// search when `range` is absent or stale.
    pub anchor_text: String,
    /// Tooltip note (comments) or generation status label (animations).
    pub payload: String,
}

impl OverlayEntity {
    pub fn from_annotation(ann: &Annotation) -> Self {
        let kind = match ann.kind {
            Some(AnnotationKind::Highlight) => OverlayKind::Highlight,
            Some(AnnotationKind::Favorite) => OverlayKind::Favorite,
            // Untyped legacy records are treated as plain comments.
            Some(AnnotationKind::Comment) | Some(AnnotationKind::Note) | None => {
                OverlayKind::Comment
            }
        };
        OverlayEntity {
            id: ann.id.clone(),
            range: ann.range,
            kind,
            anchor_text: ann.anchor_text().to_string(),
            payload: ann.text.clone(),
        }
    }

    pub fn from_animation(anim: &Animation) -> Self {
        OverlayEntity {
            id: anim.id.clone(),
            range: anim.range,
            kind: OverlayKind::AnimationLink,
            anchor_text: String::new(),
            payload: anim.status.to_string(),
        }
    }

    /// All renderable entities carried by a node, annotations first then
    /// animation links, in stored order.
    pub fn collect(node: &Node) -> Vec<OverlayEntity> {
        node.annotations
            .iter()
            .map(OverlayEntity::from_annotation)
            .chain(node.animations.iter().map(OverlayEntity::from_animation))
            .collect()
    }

    fn open_tag(&self) -> String {
        match self.kind {
            OverlayKind::Highlight => format!(
                "<a href=\"highlight://{}\" class=\"highlight-mark\">",
                escape_attr(&self.id)
            ),
            OverlayKind::Comment => format!(
                "<span class=\"annotation-mark\" data-annotation-id=\"{}\" title=\"{}\">",
                escape_attr(&self.id),
                escape_attr(&self.payload)
            ),
            OverlayKind::Favorite => {
                format!("<span class=\"favorite-mark\" id=\"fav-{}\">", escape_attr(&self.id))
            }
            OverlayKind::AnimationLink => format!(
                "<span class=\"animation-link\" data-animation-id=\"{}\" data-status=\"{}\">",
                escape_attr(&self.id),
                escape_attr(&self.payload)
            ),
        }
    }

    fn close_tag(&self) -> &'static str {
        match self.kind {
            OverlayKind::Highlight => "</a>",
            _ => "</span>",
        }
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Marker side. End sorts before Start so that adjacent (non-overlapping)
/// regions never get falsely merged: at equal offsets the closing tag is
/// always emitted before the next opening tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MarkerSide {
    End,
    Start,
}

#[derive(Debug)]
struct Marker {
    offset: usize,
    side: MarkerSide,
    seq: usize,
}

/// Resolve each entity's range (stored range if valid, else first-occurrence
/// text search), then sweep the text left to right emitting open/close tags.
///
/// Entities whose range cannot be resolved are skipped silently; the
/// document must always render even with stale annotation data. Overlapping
/// entities of different kinds nest; the engine does not try to prevent
/// semantically contradictory overlaps.
pub fn apply_overlay(text: &str, entities: &[OverlayEntity]) -> String {
    let text_len = text.chars().count();

    let resolved: Vec<(&OverlayEntity, CharRange)> = entities
        .iter()
        .filter_map(|entity| {
            let range = entity
                .range
                .filter(|r| r.validate(text_len))
                .or_else(|| locate_by_text(text, &entity.anchor_text, 0));
            match range {
                Some(range) => Some((entity, range)),
                None => {
                    tracing::debug!(
                        "Skipping overlay entity {} with unresolvable range",
                        entity.id
                    );
                    None
                }
            }
        })
        .collect();

    let mut markers = Vec::with_capacity(resolved.len() * 2);
    for (seq, (_, range)) in resolved.iter().enumerate() {
        markers.push(Marker {
            offset: range.start,
            side: MarkerSide::Start,
            seq,
        });
        markers.push(Marker {
            offset: range.end,
            side: MarkerSide::End,
            seq,
        });
    }
    // Start ties: wider region opens first (descending end). End ties:
    // inner region closes first (descending start). Identical ranges fall
    // back to insertion order, inverted on the close side, so the tags
    // always nest instead of crossing.
    markers.sort_by(|a, b| {
        (a.offset, a.side).cmp(&(b.offset, b.side)).then_with(|| {
            let ra = resolved[a.seq].1;
            let rb = resolved[b.seq].1;
            match a.side {
                MarkerSide::Start => rb.end.cmp(&ra.end).then(a.seq.cmp(&b.seq)),
                MarkerSide::End => rb.start.cmp(&ra.start).then(b.seq.cmp(&a.seq)),
            }
        })
    });

    let byte_of = char_byte_offsets(text);
    let mut out = String::with_capacity(text.len() + resolved.len() * 64);
    let mut cursor = 0usize;
    for marker in markers {
        if marker.offset > cursor {
            out.push_str(&text[byte_of[cursor]..byte_of[marker.offset]]);
            cursor = marker.offset;
        }
        let (entity, _) = resolved[marker.seq];
        match marker.side {
            MarkerSide::Start => out.push_str(&entity.open_tag()),
            MarkerSide::End => out.push_str(entity.close_tag()),
        }
    }
    if cursor < text_len {
        out.push_str(&text[byte_of[cursor]..]);
    }
    out
}

static OVERLAY_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"<span class="(?:favorite-mark|annotation-mark|animation-link)"[^>]*>"#,
        r#"|<a href="highlight://[^"]*" class="highlight-mark">"#,
        r#"|</span>"#,
        r#"|</a>"#,
    ))
    .expect("overlay token regex is valid")
});

/// Remove exactly the tags [`apply_overlay`] emits, reconstructing the
/// original text. Close tokens that do not pair with an engine-emitted open
/// token are kept verbatim, so user text containing literal `</span>` or
/// `</a>` survives.
pub fn strip_overlay(marked: &str) -> String {
    let mut out = String::with_capacity(marked.len());
    let mut last = 0usize;
    let mut span_depth = 0usize;
    let mut anchor_depth = 0usize;
    for m in OVERLAY_TOKEN_RE.find_iter(marked) {
        out.push_str(&marked[last..m.start()]);
        last = m.start();
        let token = m.as_str();
        let consumed = if token == "</span>" {
            if span_depth > 0 {
                span_depth -= 1;
                true
            } else {
                false
            }
        } else if token == "</a>" {
            if anchor_depth > 0 {
                anchor_depth -= 1;
                true
            } else {
                false
            }
        } else {
            if token.starts_with("<a ") {
                anchor_depth += 1;
            } else {
                span_depth += 1;
            }
            true
        };
        if consumed {
            last = m.end();
        }
    }
    out.push_str(&marked[last..]);
    out
}

/// Render a node's content with all of its annotations and animation links
/// overlaid.
pub fn render_node(node: &Node) -> String {
    apply_overlay(&node.content_md, &OverlayEntity::collect(node))
}
