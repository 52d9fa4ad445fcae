//! # mindgraph-core
//!
//! A Rust library modeling knowledge-node graphs whose node bodies are
//! Markdown documents, with character-range annotations rendered as
//! overlay markup and document structure projected into navigable trees.
//!
//! ## Overview
//!
//! Each node carries a Markdown body plus range-tagged entities
//! (annotations, favorites, animation links). The library keeps the graph
//! consistent under mutation and derives every presentation surface
//! on read, nothing derived is ever persisted.
//!
//! ### Key features
//!
//! - **Overlay rendering**: annotations become nested inline markup over
//!   the raw Markdown, with a lossless strip back to the source text
//! - **Heading projections**: fence-aware heading scan producing a table
//!   of contents and a mind-map tree, plus per-section text extraction
//!   with exact range remapping
//! - **Graph store**: node/edge ownership with referential invariants,
//!   cascade deletes, neighbor queries and tree auto-layout
//! - **Context assembly**: parent/sibling/child neighborhoods flattened
//!   into prompt blocks for an external generation collaborator
//! - **Event streaming**: store mutations emitted to an optional channel
//!   for cache or UI synchronization
//!
//! ## Architecture
//!
//! - **[`range`]**: validated half-open character ranges and text search
//! - **[`overlay`]**: overlay markup application and stripping
//! - **[`projection`]**: TOC, mind-map, section extraction, decoration
//! - **[`graph`]**: `GraphStore`, neighbor queries, `ContextPayload`
//! - **[`properties`]**: node/edge/annotation types and identifiers
//! - **[`event`]**: mutation events for external collaborators
//! - **[`export`]**: project JSON dumps and flattened Markdown export
//!
//! ## Quick start
//!
//! ```rust
//! use mindgraph_core::graph::GraphStore;
//! use mindgraph_core::overlay::render_node;
//! use mindgraph_core::projection::build_projections;
//! use mindgraph_core::properties::{Nid, Node};
//!
//! # fn main() -> Result<(), mindgraph_core::MindGraphError> {
//! let mut store = GraphStore::new();
//! let root = store.add_node(
//!     Node::new(Nid::new(), "Reading notes").with_content("# Intro\nBody\n"),
//! )?;
//!
//! let node = store.node(root).unwrap();
//! let projection = build_projections(&node.content_md);
//! assert_eq!(projection.toc.len(), 1);
//!
//! let rendered = render_node(node);
//! assert!(rendered.contains("Body"));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod event;
pub mod export;
pub mod graph;
pub mod overlay;
pub mod projection;
pub mod properties;
pub mod range;

pub use error::*;
