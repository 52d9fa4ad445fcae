//! Section extraction and offset remapping.
//!
//! A section is the sub-range of a document's text associated with one
//! heading: from that heading's source line to the next heading's line
//! (exclusive) or end of document. The synthetic root's section is all
//! content before the first heading.
//!
//! When a section is rendered standalone, a synthetic heading line is
//! prepended; annotation offsets are remapped into the extracted view with
//! exact arithmetic so that a later write-back can invert it.

use serde::{Deserialize, Serialize};

use super::heading::TocItem;
use crate::{
    properties::{Animation, Annotation, AnnotationKind},
    range::{char_byte_offsets, locate_by_text, CharRange},
};

/// Anchor used for the synthetic root section in decorations.
pub const ROOT_ANCHOR: &str = "root";

/// One extracted section: its standalone text, the char bounds of its
/// sub-content within the original document, and the length of the
/// synthetic heading prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionView {
    /// The owning heading, or `None` for the synthetic root section.
    pub heading: Option<TocItem>,
    /// Standalone text: a synthetic heading line (if any) plus the
    /// section's sub-content.
    pub text: String,
    /// Char bounds of the sub-content within the original document.
    pub bounds: CharRange,
    /// Char length of the synthetic heading prefix in `text`.
    pub prefix_len: usize,
}

impl SectionView {
    /// Remap a document-offset range into this extracted view. Ranges not
    /// entirely within the section bounds are excluded (`None`).
    pub fn remap(&self, range: CharRange) -> Option<CharRange> {
        remap_range(self.bounds, self.prefix_len, range)
    }

    /// Invert [`SectionView::remap`]: map a range created while viewing the
    /// extracted section back into document offsets.
    pub fn unmap(&self, range: CharRange) -> Option<CharRange> {
        unmap_range(self.bounds, self.prefix_len, range)
    }

    /// The section's annotations with ranges remapped into the extracted
    /// view. Annotations without a stored in-bounds range are excluded.
    pub fn remap_annotations(&self, annotations: &[Annotation]) -> Vec<Annotation> {
        annotations
            .iter()
            .filter_map(|ann| {
                let range = ann.range?;
                let remapped = self.remap(range)?;
                let mut out = ann.clone();
                out.range = Some(remapped);
                Some(out)
            })
            .collect()
    }
}

/// `{start - bounds.start + prefix_len, end - bounds.start + prefix_len}`
/// when `range` falls entirely within `bounds`, else `None`.
pub fn remap_range(bounds: CharRange, prefix_len: usize, range: CharRange) -> Option<CharRange> {
    if range.start >= bounds.start && range.end <= bounds.end && range.start < range.end {
        Some(CharRange::new(
            range.start - bounds.start + prefix_len,
            range.end - bounds.start + prefix_len,
        ))
    } else {
        None
    }
}

/// Exact inverse of [`remap_range`]. Ranges that touch the synthetic
/// heading prefix cannot be written back and yield `None`.
pub fn unmap_range(bounds: CharRange, prefix_len: usize, range: CharRange) -> Option<CharRange> {
    if range.start < prefix_len || range.start >= range.end {
        return None;
    }
    let start = range.start - prefix_len + bounds.start;
    let end = range.end - prefix_len + bounds.start;
    if end <= bounds.end {
        Some(CharRange::new(start, end))
    } else {
        None
    }
}

/// Char offset of the start of each source line, plus positions after every
/// newline (so `starts[line]` addresses any line index `lines()` yields).
fn line_start_offsets(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    let mut offset = 0usize;
    for ch in text.chars() {
        offset += 1;
        if ch == '\n' {
            starts.push(offset);
        }
    }
    starts
}

fn char_slice(text: &str, start: usize, end: usize) -> String {
    let byte_of = char_byte_offsets(text);
    text[byte_of[start]..byte_of[end]].to_string()
}

/// Extract the section owned by `toc[index]`, or the synthetic root section
/// (all content before the first heading) when `index` is `None`.
///
/// Returns `None` for an out-of-range index, so a caller holding a stale
/// TOC gets a miss instead of a panic.
pub fn extract_section(content: &str, toc: &[TocItem], index: Option<usize>) -> Option<SectionView> {
    let total = content.chars().count();
    let starts = line_start_offsets(content);
    let line_start = |line: usize| starts.get(line).copied().unwrap_or(total);

    let Some(idx) = index else {
        let end = toc.first().map(|item| line_start(item.line)).unwrap_or(total);
        return Some(SectionView {
            heading: None,
            text: char_slice(content, 0, end),
            bounds: CharRange::new(0, end),
            prefix_len: 0,
        });
    };

    let item = toc.get(idx)?;
    let body_start = line_start(item.line + 1);
    let end = toc
        .get(idx + 1)
        .map(|next| line_start(next.line))
        .unwrap_or(total);
    let body_start = body_start.min(end);

    let prefix = format!("{} {}\n", "#".repeat(item.level as usize), item.text);
    let prefix_len = prefix.chars().count();
    let body = char_slice(content, body_start, end);

    Some(SectionView {
        heading: Some(item.clone()),
        text: format!("{prefix}{body}"),
        bounds: CharRange::new(body_start, end),
        prefix_len,
    })
}

/// Per-section presence flags for range-anchored entities. Purely derived;
/// recomputed on every read, never persisted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionFlags {
    pub has_annotations: bool,
    pub has_favorites: bool,
    pub has_animations: bool,
}

/// Flags for one projected TOC/mind-map entry, keyed by its anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDecoration {
    pub anchor: String,
    pub flags: SectionFlags,
}

/// Flag each section (synthetic root first, then every TOC entry) with
/// whether any annotation, favorite, or animation link falls inside its
/// char bounds. Entity ranges are resolved the same way the overlay does:
/// stored range if valid, else first-occurrence text search.
pub fn decorate(
    content: &str,
    toc: &[TocItem],
    annotations: &[Annotation],
    animations: &[Animation],
) -> Vec<SectionDecoration> {
    let total = content.chars().count();
    let starts = line_start_offsets(content);
    let line_start = |line: usize| starts.get(line).copied().unwrap_or(total);

    // Full section spans, heading line included.
    let mut spans: Vec<(String, CharRange)> = Vec::with_capacity(toc.len() + 1);
    let first_start = toc.first().map(|item| line_start(item.line)).unwrap_or(total);
    spans.push((ROOT_ANCHOR.to_string(), CharRange::new(0, first_start)));
    for (idx, item) in toc.iter().enumerate() {
        let end = toc
            .get(idx + 1)
            .map(|next| line_start(next.line))
            .unwrap_or(total);
        spans.push((item.anchor.clone(), CharRange::new(line_start(item.line), end)));
    }

    let resolve = |range: Option<CharRange>, anchor_text: &str| -> Option<CharRange> {
        range
            .filter(|r| r.validate(total))
            .or_else(|| locate_by_text(content, anchor_text, 0))
    };

    spans
        .into_iter()
        .map(|(anchor, span)| {
            let mut flags = SectionFlags::default();
            for ann in annotations {
                let Some(range) = resolve(ann.range, ann.anchor_text()) else {
                    continue;
                };
                if span.overlaps(&range) {
                    if ann.kind == Some(AnnotationKind::Favorite) {
                        flags.has_favorites = true;
                    } else {
                        flags.has_annotations = true;
                    }
                }
            }
            for anim in animations {
                if let Some(range) = anim.range.filter(|r| r.validate(total)) {
                    if span.overlaps(&range) {
                        flags.has_animations = true;
                    }
                }
            }
            SectionDecoration { anchor, flags }
        })
        .collect()
}
