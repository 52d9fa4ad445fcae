use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::properties::{GenerationStatus, Nid};

/// Mutation events emitted by [`crate::graph::GraphStore`] for external
/// collaborators (persistence caches, UI refresh). Subscription is
/// optional; stores without a subscriber drop events silently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphEvent {
    NodeAdded(Nid),
    /// Node id, new version counter.
    NodeUpdated(Nid, u64),
    NodesRemoved(Vec<Nid>),
    EdgeAdded(Nid),
    EdgeUpdated(Nid),
    EdgesRemoved(Vec<Nid>),
    /// Node id, new generation status.
    StatusChanged(Nid, GenerationStatus),
}

impl Display for GraphEvent {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            GraphEvent::NodeAdded(_) => write!(f, "NodeAdded"),
            GraphEvent::NodeUpdated(_, _) => write!(f, "NodeUpdated"),
            GraphEvent::NodesRemoved(_) => write!(f, "NodesRemoved"),
            GraphEvent::EdgeAdded(_) => write!(f, "EdgeAdded"),
            GraphEvent::EdgeUpdated(_) => write!(f, "EdgeUpdated"),
            GraphEvent::EdgesRemoved(_) => write!(f, "EdgesRemoved"),
            GraphEvent::StatusChanged(_, _) => write!(f, "StatusChanged"),
        }
    }
}
