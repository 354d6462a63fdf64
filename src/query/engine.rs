//! Turns a filtered entry set into the node/edge set that the graph view draws.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use time::OffsetDateTime;

use crate::graph_utils::error::Result;
use crate::graph_utils::graph::GraphStore;
use crate::graph_utils::model::{
    EntryFilter, EntryId, EntryType, EntryView, OwnerId, Relationship, RelationshipId, RelationshipType, TagId,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagBadge {
    pub id: TagId,
    pub name: String,
    pub color: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: EntryId,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub tags: Vec<TagBadge>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl GraphNode {
    pub fn from_view(view: &EntryView) -> Self {
        Self {
            id: view.entry.id,
            title: view.entry.title.clone(),
            content: view.entry.content.clone(),
            entry_type: view.entry.entry_type,
            tags: view
                .tags
                .iter()
                .map(|t| TagBadge { id: t.id, name: t.name.clone(), color: t.color.clone() })
                .collect(),
            created_at: view.entry.created_at,
        }
    }

    /// Case-insensitive substring match over title, content and tag names.
    /// `needle` must already be lower-cased.
    pub fn matches_needle(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.content.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.name.to_lowercase().contains(needle))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: RelationshipId,
    pub source: EntryId,
    pub target: EntryId,
    #[serde(rename = "type")]
    pub rel_type: RelationshipType,
    pub description: Option<String>,
}

/// Induced subgraph of the currently filtered entries. Edges are indexed in both
/// directions so incident-edge lookups do not scan the edge list.
#[derive(Clone, Debug, Default, Serialize)]
pub struct GraphSnapshot {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    #[serde(skip)]
    node_index: HashMap<EntryId, usize>,
    #[serde(skip)]
    edge_index: HashMap<RelationshipId, usize>,
    #[serde(skip)]
    outgoing: HashMap<EntryId, Vec<usize>>,
    #[serde(skip)]
    incoming: HashMap<EntryId, Vec<usize>>,
}

impl GraphSnapshot {
    /// One node per distinct entry id; one edge per distinct relationship id whose
    /// endpoints both survived the filter.
    pub fn induce(nodes: impl IntoIterator<Item = GraphNode>, relationships: &[Relationship]) -> Self {
        let mut snap = GraphSnapshot::default();
        for node in nodes {
            if snap.node_index.contains_key(&node.id) {
                continue;
            }
            snap.node_index.insert(node.id, snap.nodes.len());
            snap.nodes.push(node);
        }
        for rel in relationships {
            if snap.edge_index.contains_key(&rel.id) {
                continue;
            }
            if !snap.node_index.contains_key(&rel.from_entry_id) || !snap.node_index.contains_key(&rel.to_entry_id) {
                continue;
            }
            let idx = snap.edges.len();
            snap.edge_index.insert(rel.id, idx);
            snap.outgoing.entry(rel.from_entry_id).or_default().push(idx);
            snap.incoming.entry(rel.to_entry_id).or_default().push(idx);
            snap.edges.push(GraphEdge {
                id: rel.id,
                source: rel.from_entry_id,
                target: rel.to_entry_id,
                rel_type: rel.rel_type,
                description: rel.description.clone(),
            });
        }
        snap
    }

    pub fn nodes(&self) -> &[GraphNode] { &self.nodes }
    pub fn edges(&self) -> &[GraphEdge] { &self.edges }
    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.edges.len() }
    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    pub fn contains(&self, id: EntryId) -> bool {
        self.node_index.contains_key(&id)
    }

    pub fn node(&self, id: EntryId) -> Option<&GraphNode> {
        self.node_index.get(&id).map(|i| &self.nodes[*i])
    }

    pub fn edge(&self, id: RelationshipId) -> Option<&GraphEdge> {
        self.edge_index.get(&id).map(|i| &self.edges[*i])
    }

    pub fn outgoing(&self, id: EntryId) -> impl Iterator<Item = &GraphEdge> + '_ {
        self.outgoing.get(&id).into_iter().flatten().map(|i| &self.edges[*i])
    }

    pub fn incoming(&self, id: EntryId) -> impl Iterator<Item = &GraphEdge> + '_ {
        self.incoming.get(&id).into_iter().flatten().map(|i| &self.edges[*i])
    }

    pub fn incident_edges(&self, id: EntryId) -> impl Iterator<Item = &GraphEdge> + '_ {
        self.outgoing(id).chain(self.incoming(id))
    }

    /// Nodes at graph-distance 1, either direction; excludes `id` itself unless self-linked.
    pub fn neighbors(&self, id: EntryId) -> HashSet<EntryId> {
        self.outgoing(id)
            .map(|e| e.target)
            .chain(self.incoming(id).map(|e| e.source))
            .collect()
    }

    pub fn degree(&self, id: EntryId) -> usize {
        self.incident_edges(id).count()
    }

    /// Node ids whose title, content or any tag name contains `query`, ignoring case.
    /// A blank query matches nothing.
    pub fn search_matches(&self, query: &str) -> HashSet<EntryId> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return HashSet::new();
        }
        self.nodes
            .iter()
            .filter(|n| n.matches_needle(&needle))
            .map(|n| n.id)
            .collect()
    }
}

pub struct QueryEngine;

impl QueryEngine {
    /// Filter the owner's entries and induce the subgraph over the owner's relationships.
    pub fn snapshot(store: &GraphStore, owner: OwnerId, filter: &EntryFilter) -> Result<GraphSnapshot> {
        let views = store.list_entry_views(owner, filter);
        let relationships = store.relationships(owner);
        Ok(GraphSnapshot::induce(views.iter().map(GraphNode::from_view), &relationships))
    }
}
