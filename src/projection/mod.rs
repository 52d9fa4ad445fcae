//! Projection module: heading-derived views of a node's Markdown content.
//!
//! Projections are pure and idempotent. They are recomputed on every read,
//! never persisted, and always agree with the same underlying text buffer
//! and its range-indexed metadata.
//!
//! # Module Organization
//!
//! - [`heading`]: fence-aware heading scan, table of contents, mind-map tree
//! - [`section`]: per-heading section bounds, standalone extraction, offset
//!   remapping, and the annotation decoration pass

mod heading;
mod section;

pub use heading::{
    build_projections, heading_anchor, scan_headings, DocumentProjection, MindMap, MindMapEdge,
    MindMapNode, TocItem, MAX_HEADING_LEVEL,
};
pub use section::{
    decorate, extract_section, remap_range, unmap_range, SectionDecoration, SectionFlags,
    SectionView, ROOT_ANCHOR,
};
