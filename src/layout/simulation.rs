//! Force-directed layout over a graph snapshot.
//!
//! Nodes live in one index-addressed arena owned by [`LayoutEngine`]. The physics tick is
//! the only writer of positions and velocities; callers influence a node exclusively through
//! [`LayoutEngine::set_pin`].

use std::collections::HashMap;

use egui::{Pos2, Vec2};
use rand::{SeedableRng, rngs::StdRng};

use crate::graph_utils::model::EntryId;
use crate::query::GraphSnapshot;

use super::forces;

/// Ticking stops once alpha cools below this.
pub const ALPHA_MIN: f32 = 0.001;
/// Fraction of velocity lost per tick.
pub const VELOCITY_DECAY: f32 = 0.4;
/// Alpha target held while a node is being dragged.
pub const DRAG_ALPHA_TARGET: f32 = 0.3;

const MEDIUM_GRAPH: usize = 50;
const LARGE_GRAPH: usize = 100;
const INITIAL_RADIUS: f32 = 10.0;
/// Collision relaxation passes per tick.
const COLLIDE_ITERATIONS: usize = 2;

/// Exclusion radius used by the collision force: longer titles get more room, within bounds.
pub fn collision_radius(title: &str) -> f32 {
    (title.chars().count() as f32 * 0.8 + 5.0).clamp(20.0, 30.0)
}

/// Size-tiered simulation constants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceParams {
    pub link_distance: f32,
    pub link_strength: f32,
    pub charge_strength: f32,
    pub alpha_start: f32,
    pub alpha_decay: f32,
    /// Emit only every other intermediate frame.
    pub throttle: bool,
}

impl ForceParams {
    pub fn for_graph_size(n: usize) -> Self {
        let medium = n > MEDIUM_GRAPH;
        let large = n > LARGE_GRAPH;
        Self {
            link_distance: if medium { 80.0 } else { 100.0 },
            link_strength: if medium { 0.3 } else { 0.5 },
            charge_strength: if medium { -200.0 } else { -300.0 },
            alpha_start: if large { 0.1 } else { 0.3 },
            alpha_decay: if large { 0.02 } else { 0.0228 },
            throttle: large,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimNode {
    pub id: EntryId,
    pub pos: Pos2,
    pub vel: Vec2,
    /// Fixed position overriding physics while set.
    pub pin: Option<Pos2>,
    /// Pin is cleared after the next tick.
    release_pending: bool,
    pub radius: f32,
}

impl SimNode {
    pub fn new(id: EntryId, pos: Pos2, radius: f32) -> Self {
        Self { id, pos, vel: Vec2::ZERO, pin: None, release_pending: false, radius }
    }

    pub fn is_pinned(&self) -> bool {
        self.pin.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimLink {
    pub source: usize,
    pub target: usize,
    /// Share of the correction applied to the target end.
    pub bias: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Positions changed and this frame should be drawn.
    pub emitted: bool,
    /// The simulation has cooled; further ticks are no-ops until reheated.
    pub settled: bool,
}

pub struct LayoutEngine {
    nodes: Vec<SimNode>,
    index: HashMap<EntryId, usize>,
    links: Vec<SimLink>,
    params: ForceParams,
    alpha: f32,
    alpha_target: f32,
    center: Pos2,
    rng: StdRng,
    ticks: u64,
}

impl LayoutEngine {
    pub fn new(graph: &GraphSnapshot, center: Pos2, seed: u64) -> Self {
        Self::with_positions(graph, center, seed, &HashMap::new())
    }

    /// Like [`LayoutEngine::new`] but nodes found in `warm` start from their saved position.
    pub fn with_positions(graph: &GraphSnapshot, center: Pos2, seed: u64, warm: &HashMap<EntryId, Pos2>) -> Self {
        let params = ForceParams::for_graph_size(graph.node_count());
        let mut nodes = Vec::with_capacity(graph.node_count());
        let mut index = HashMap::with_capacity(graph.node_count());
        for (i, n) in graph.nodes().iter().enumerate() {
            let pos = warm.get(&n.id).copied().unwrap_or_else(|| phyllotaxis(center, i));
            index.insert(n.id, nodes.len());
            nodes.push(SimNode::new(n.id, pos, collision_radius(&n.title)));
        }

        let mut degree = vec![0usize; nodes.len()];
        let mut pairs = Vec::with_capacity(graph.edge_count());
        for e in graph.edges() {
            let (Some(&s), Some(&t)) = (index.get(&e.source), index.get(&e.target)) else {
                continue;
            };
            degree[s] += 1;
            degree[t] += 1;
            pairs.push((s, t));
        }
        let links = pairs
            .into_iter()
            .map(|(s, t)| SimLink {
                source: s,
                target: t,
                bias: degree[s] as f32 / (degree[s] + degree[t]) as f32,
            })
            .collect();

        log::debug!(
            "layout restart: {} nodes, {} links, alpha {}",
            nodes.len(),
            graph.edge_count(),
            params.alpha_start
        );
        Self {
            nodes,
            index,
            links,
            params,
            alpha: params.alpha_start,
            alpha_target: 0.0,
            center,
            rng: StdRng::seed_from_u64(seed),
            ticks: 0,
        }
    }

    /// Advance the simulation one step.
    pub fn tick(&mut self) -> TickOutcome {
        if self.nodes.is_empty() {
            return TickOutcome { emitted: false, settled: true };
        }
        if !self.is_running() {
            self.flush_releases();
            return TickOutcome { emitted: false, settled: true };
        }

        self.alpha += (self.alpha_target - self.alpha) * self.params.alpha_decay;
        let alpha = self.alpha;
        let p = self.params;
        forces::link(&mut self.nodes, &self.links, p.link_distance, p.link_strength, alpha, &mut self.rng);
        forces::charge(&mut self.nodes, p.charge_strength, alpha, &mut self.rng);
        forces::center(&mut self.nodes, self.center);
        for _ in 0..COLLIDE_ITERATIONS {
            forces::collide(&mut self.nodes, &mut self.rng);
        }

        for node in &mut self.nodes {
            match node.pin {
                Some(pin) => {
                    node.pos = pin;
                    node.vel = Vec2::ZERO;
                }
                None => {
                    node.vel *= 1.0 - VELOCITY_DECAY;
                    node.pos += node.vel;
                }
            }
        }
        self.flush_releases();
        self.ticks += 1;

        let settled = !self.is_running();
        let emitted = settled || !p.throttle || self.ticks % 2 == 0;
        TickOutcome { emitted, settled }
    }

    /// Tick until cool or until `max_ticks` have run. Returns the number of ticks taken.
    pub fn run_until_settled(&mut self, max_ticks: usize) -> usize {
        let mut n = 0;
        while n < max_ticks && !self.is_settled() {
            self.tick();
            n += 1;
        }
        n
    }

    fn flush_releases(&mut self) {
        for node in &mut self.nodes {
            if node.release_pending {
                node.pin = None;
                node.release_pending = false;
            }
        }
    }

    fn is_running(&self) -> bool {
        self.alpha >= ALPHA_MIN || self.alpha_target >= ALPHA_MIN
    }

    pub fn is_settled(&self) -> bool {
        self.nodes.is_empty() || !self.is_running()
    }

    /// Pin `id` at `pos`, or with `None` release it. A released node keeps its pin for one
    /// more tick so it is drawn where the user let go. Returns false for unknown ids.
    pub fn set_pin(&mut self, id: EntryId, pos: Option<Pos2>) -> bool {
        let Some(&i) = self.index.get(&id) else {
            return false;
        };
        let node = &mut self.nodes[i];
        match pos {
            Some(p) => {
                node.pin = Some(p);
                node.release_pending = false;
            }
            None => {
                if node.pin.is_some() {
                    node.release_pending = true;
                }
            }
        }
        true
    }

    pub fn set_alpha_target(&mut self, target: f32) {
        self.alpha_target = target;
    }

    pub fn reheat(&mut self) {
        self.alpha = self.alpha.max(self.params.alpha_start);
    }

    pub fn set_center(&mut self, center: Pos2) {
        self.center = center;
    }

    pub fn center(&self) -> Pos2 {
        self.center
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f32 {
        self.alpha_target
    }

    pub fn params(&self) -> ForceParams {
        self.params
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub fn node(&self, id: EntryId) -> Option<&SimNode> {
        self.index.get(&id).map(|i| &self.nodes[*i])
    }

    pub fn position(&self, id: EntryId) -> Option<Pos2> {
        self.node(id).map(|n| n.pos)
    }

    pub fn positions(&self) -> HashMap<EntryId, Pos2> {
        self.nodes.iter().map(|n| (n.id, n.pos)).collect()
    }
}

/// Sunflower seed placement: evenly spread, deterministic, no two nodes coincide.
fn phyllotaxis(center: Pos2, i: usize) -> Pos2 {
    let golden_angle = std::f32::consts::PI * (3.0 - 5.0f32.sqrt());
    let r = INITIAL_RADIUS * (0.5 + i as f32).sqrt();
    let theta = i as f32 * golden_angle;
    Pos2::new(center.x + r * theta.cos(), center.y + r * theta.sin())
}
