//! Graph module: the node/edge store and queries over it.
//!
//! # Module Organization
//!
//! - [`store`]: [`GraphStore`] — node/edge ownership, referential
//!   invariants, cascaded deletes, neighbor queries, tree layout, and the
//!   per-node generation state machine
//! - [`context`]: [`ContextPayload`] — the textual neighborhood summary
//!   handed to the external generation collaborator
//!
//! The store is an explicit value owned by the call site; entities are
//! referenced by [`crate::properties::Nid`], never by direct pointer.

mod context;
mod store;


pub use context::{ContextPayload, NeighborSummary};
pub use store::{EdgePatch, GraphStore, NodeGraph, NodePatch, H_SPACING, V_SPACING};
