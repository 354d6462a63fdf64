//! Opacity and emphasis rules derived from the interaction state.
//!
//! Hover emphasis wins inside the hovered neighbourhood. Outside it, nodes follow the search
//! treatment while a search is active and are dimmed otherwise. With no hover at all, only the
//! search treatment applies.

use std::collections::HashSet;

use crate::graph_utils::model::{EntryId, RelationshipId};
use crate::query::GraphSnapshot;

use super::controller::InteractionState;

pub const FULL_OPACITY: f32 = 1.0;
pub const NEIGHBOR_OPACITY: f32 = 0.8;
pub const DIMMED_NODE_OPACITY: f32 = 0.3;
pub const DIMMED_EDGE_OPACITY: f32 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeLook {
    pub opacity: f32,
    /// Amber ring marking a search match.
    pub search_ring: bool,
    /// Directly under the pointer or being dragged; drawn enlarged.
    pub hovered: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeLook {
    pub opacity: f32,
    /// The hovered link itself; drawn wider and fully opaque.
    pub hovered: bool,
}

#[derive(Clone, Debug, PartialEq)]
enum Focus {
    None,
    Node { id: EntryId, neighbors: HashSet<EntryId>, edges: HashSet<RelationshipId> },
    Link { id: RelationshipId, endpoints: [EntryId; 2] },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Highlight {
    focus: Focus,
    matches: HashSet<EntryId>,
}

impl Highlight {
    pub fn compute(state: &InteractionState, graph: &GraphSnapshot) -> Self {
        let focus = if let Some(id) = state.pointer.focus_node().filter(|id| graph.contains(*id)) {
            Focus::Node {
                id,
                neighbors: graph.neighbors(id),
                edges: graph.incident_edges(id).map(|e| e.id).collect(),
            }
        } else if let Some(edge) = state.pointer.focus_link().and_then(|id| graph.edge(id)) {
            Focus::Link { id: edge.id, endpoints: [edge.source, edge.target] }
        } else {
            Focus::None
        };
        Self { focus, matches: state.search.matches().clone() }
    }

    pub fn has_focus(&self) -> bool {
        self.focus != Focus::None
    }

    pub fn search_active(&self) -> bool {
        !self.matches.is_empty()
    }

    pub fn node(&self, id: EntryId) -> NodeLook {
        let search_ring = self.matches.contains(&id);
        let inside = match &self.focus {
            Focus::Node { id: f, .. } if *f == id => Some((FULL_OPACITY, true)),
            Focus::Node { neighbors, .. } if neighbors.contains(&id) => Some((NEIGHBOR_OPACITY, false)),
            Focus::Link { endpoints, .. } if endpoints.contains(&id) => Some((FULL_OPACITY, false)),
            _ => None,
        };
        match inside {
            Some((opacity, hovered)) => NodeLook { opacity, search_ring, hovered },
            None => {
                let opacity = if self.search_active() {
                    if search_ring { FULL_OPACITY } else { DIMMED_NODE_OPACITY }
                } else if self.has_focus() {
                    DIMMED_NODE_OPACITY
                } else {
                    FULL_OPACITY
                };
                NodeLook { opacity, search_ring, hovered: false }
            }
        }
    }

    pub fn edge(&self, id: RelationshipId) -> EdgeLook {
        match &self.focus {
            Focus::None => EdgeLook { opacity: FULL_OPACITY, hovered: false },
            Focus::Node { edges, .. } => EdgeLook {
                opacity: if edges.contains(&id) { FULL_OPACITY } else { DIMMED_EDGE_OPACITY },
                hovered: false,
            },
            Focus::Link { id: f, .. } if *f == id => EdgeLook { opacity: FULL_OPACITY, hovered: true },
            Focus::Link { .. } => EdgeLook { opacity: DIMMED_EDGE_OPACITY, hovered: false },
        }
    }

    /// Node ids drawn dimmed.
    pub fn dimmed_nodes<'a>(&'a self, graph: &'a GraphSnapshot) -> impl Iterator<Item = EntryId> + 'a {
        graph.nodes().iter().map(|n| n.id).filter(|id| self.node(*id).opacity <= DIMMED_NODE_OPACITY)
    }
}
