//! Projection of interaction state plus layout positions into drawables.
//!
//! [`render`] is idempotent and touches no global state; the GUI paints its output and uses
//! the hit-testing helpers to turn pointer positions into interaction events.

use egui::{Color32, Pos2, Stroke, Vec2};

use crate::graph_utils::model::{EntryId, RelationshipId};
use crate::interaction::{Highlight, InteractionState, ViewTransform};
use crate::layout::LayoutEngine;
use crate::query::GraphSnapshot;

use super::style;

pub const MIN_CANVAS_SIDE: f32 = 400.0;
pub const DEFAULT_CANVAS: Vec2 = Vec2::new(800.0, 600.0);

/// Drawing surface size. Unmeasurable containers fall back to a fixed default.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasSize {
    pub width: f32,
    pub height: f32,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self::measure(None, DEFAULT_CANVAS)
    }
}

impl CanvasSize {
    pub fn measure(measured: Option<Vec2>, fallback: Vec2) -> Self {
        let pick = |m: Option<f32>, f: f32| {
            let v = m.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(f);
            v.max(MIN_CANVAS_SIDE)
        };
        Self { width: pick(measured.map(|m| m.x), fallback.x), height: pick(measured.map(|m| m.y), fallback.y) }
    }

    pub fn center(&self) -> Pos2 {
        Pos2::new(self.width / 2.0, self.height / 2.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeDrawable {
    pub id: EntryId,
    /// World coordinates; apply [`Scene::view`] to place on screen.
    pub center: Pos2,
    pub radius: f32,
    pub fill: Color32,
    pub stroke: Stroke,
    pub opacity: f32,
    pub label: String,
    pub label_pos: Pos2,
    pub hovered: bool,
    pub search_ring: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeDrawable {
    pub id: RelationshipId,
    pub from: Pos2,
    pub to: Pos2,
    pub color: Color32,
    pub width: f32,
    /// Stroke opacity combined with the highlight opacity.
    pub opacity: f32,
    pub dashed: bool,
    pub hovered: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub nodes: usize,
    pub links: usize,
    /// Present only while a search has matches.
    pub matches: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum HoverCard {
    Node { title: String, preview: String, tags: Vec<(String, Color32)> },
    Link { label: String, description: Option<String>, color: Color32 },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    pub view: ViewTransform,
    pub edges: Vec<EdgeDrawable>,
    pub nodes: Vec<NodeDrawable>,
    pub stats: GraphStats,
    pub hover_card: Option<HoverCard>,
}

pub fn render(state: &InteractionState, layout: &LayoutEngine, graph: &GraphSnapshot) -> Scene {
    let highlight = Highlight::compute(state, graph);

    let edges = graph
        .edges()
        .iter()
        .filter_map(|e| {
            let from = layout.position(e.source)?;
            let to = layout.position(e.target)?;
            let look = highlight.edge(e.id);
            Some(EdgeDrawable {
                id: e.id,
                from,
                to,
                color: style::relationship_color(e.rel_type),
                width: if look.hovered { style::HOVERED_EDGE_WIDTH } else { style::EDGE_WIDTH },
                opacity: if look.hovered { 1.0 } else { style::EDGE_STROKE_OPACITY * look.opacity },
                dashed: style::is_dashed(e.rel_type),
                hovered: look.hovered,
            })
        })
        .collect();

    let nodes = graph
        .nodes()
        .iter()
        .filter_map(|n| {
            let center = layout.position(n.id)?;
            let look = highlight.node(n.id);
            let stroke = if look.search_ring {
                Stroke::new(style::EMPHASIS_STROKE_WIDTH, style::SEARCH_RING_COLOR)
            } else if look.hovered {
                Stroke::new(style::EMPHASIS_STROKE_WIDTH, style::NODE_STROKE_COLOR)
            } else {
                Stroke::new(style::NODE_STROKE_WIDTH, style::NODE_STROKE_COLOR)
            };
            Some(NodeDrawable {
                id: n.id,
                center,
                radius: if look.hovered { style::hovered_node_radius(&n.title) } else { style::node_radius(&n.title) },
                fill: style::entry_color(n.entry_type),
                stroke,
                opacity: look.opacity,
                label: style::truncate_label(&n.title),
                label_pos: center + Vec2::new(0.0, style::LABEL_OFFSET_Y),
                hovered: look.hovered,
                search_ring: look.search_ring,
            })
        })
        .collect();

    let matches = state.search.matches().len();
    Scene {
        view: state.view,
        edges,
        nodes,
        stats: GraphStats {
            nodes: graph.node_count(),
            links: graph.edge_count(),
            matches: (matches > 0).then_some(matches),
        },
        hover_card: hover_card(state, graph),
    }
}

fn hover_card(state: &InteractionState, graph: &GraphSnapshot) -> Option<HoverCard> {
    if let Some(node) = state.pointer.focus_node().and_then(|id| graph.node(id)) {
        return Some(HoverCard::Node {
            title: node.title.clone(),
            preview: style::content_preview(&node.content),
            tags: node
                .tags
                .iter()
                .map(|t| {
                    let color = t.color.as_deref().and_then(style::parse_hex_color).unwrap_or(style::FALLBACK_COLOR);
                    (t.name.clone(), color)
                })
                .collect(),
        });
    }
    let edge = state.pointer.focus_link().and_then(|id| graph.edge(id))?;
    Some(HoverCard::Link {
        label: edge.rel_type.human_label(),
        description: edge.description.clone(),
        color: style::relationship_color(edge.rel_type),
    })
}

impl Scene {
    /// Topmost node under a world-space point. Later nodes are drawn over earlier ones.
    pub fn node_at(&self, world: Pos2) -> Option<EntryId> {
        self.nodes
            .iter()
            .rev()
            .find(|n| n.center.distance(world) <= n.radius)
            .map(|n| n.id)
    }

    /// Nearest edge within `tolerance` screen points of a world-space point.
    pub fn edge_at(&self, world: Pos2, tolerance: f32) -> Option<RelationshipId> {
        let reach = tolerance / self.view.scale;
        self.edges
            .iter()
            .map(|e| (e.id, point_segment_distance(world, e.from, e.to)))
            .filter(|(_, d)| *d <= reach)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    pub fn node(&self, id: EntryId) -> Option<&NodeDrawable> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: RelationshipId) -> Option<&EdgeDrawable> {
        self.edges.iter().find(|e| e.id == id)
    }
}

/// Distance from `p` to the segment `ab`.
pub fn point_segment_distance(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let len2 = ab.length_sq();
    if len2 <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Split a segment into dash pieces of length [`style::DASH`] separated by equal gaps.
pub fn dash_segments(from: Pos2, to: Pos2, scale: f32) -> Vec<[Pos2; 2]> {
    let d = to - from;
    let len = d.length();
    let step = style::DASH * scale.max(f32::EPSILON);
    if len <= f32::EPSILON {
        return Vec::new();
    }
    let dir = d / len;
    let mut out = Vec::new();
    let mut s = 0.0;
    while s < len {
        let e = (s + step).min(len);
        out.push([from + dir * s, from + dir * e]);
        s += step * 2.0;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_falls_back_and_enforces_minimum() {
        assert_eq!(CanvasSize::measure(None, DEFAULT_CANVAS), CanvasSize { width: 800.0, height: 600.0 });
        let zero = CanvasSize::measure(Some(Vec2::ZERO), DEFAULT_CANVAS);
        assert_eq!(zero, CanvasSize { width: 800.0, height: 600.0 });
        let small = CanvasSize::measure(Some(Vec2::new(300.0, 1000.0)), DEFAULT_CANVAS);
        assert_eq!(small, CanvasSize { width: 400.0, height: 1000.0 });
        let nan = CanvasSize::measure(Some(Vec2::new(f32::NAN, 500.0)), DEFAULT_CANVAS);
        assert_eq!(nan.width, 800.0);
    }

    #[test]
    fn segment_distance() {
        let a = Pos2::new(0.0, 0.0);
        let b = Pos2::new(10.0, 0.0);
        assert_eq!(point_segment_distance(Pos2::new(5.0, 3.0), a, b), 3.0);
        assert_eq!(point_segment_distance(Pos2::new(-4.0, 3.0), a, b), 5.0);
        assert_eq!(point_segment_distance(Pos2::new(1.0, 1.0), a, a), 2f32.sqrt());
    }

    #[test]
    fn dashes_cover_half_the_line() {
        let dashes = dash_segments(Pos2::new(0.0, 0.0), Pos2::new(40.0, 0.0), 1.0);
        assert_eq!(dashes.len(), 4);
        assert_eq!(dashes[1][0], Pos2::new(10.0, 0.0));
    }
}
