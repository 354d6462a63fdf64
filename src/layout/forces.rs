//! Force kernels. Each one only accumulates into node velocities (centering is the
//! exception and shifts positions directly); integration happens in the simulation.

use egui::Vec2;
use rand::Rng;

use super::simulation::{SimLink, SimNode};

/// Tiny random nudge used to break exact coincidences.
fn jiggle(rng: &mut impl Rng) -> f32 {
    rng.gen_range(-0.5f32..0.5) * 1e-6
}

fn nonzero(v: f32, rng: &mut impl Rng) -> f32 {
    if v == 0.0 { jiggle(rng) } else { v }
}

/// Springs along every link toward `distance`. The correction is split between the two ends
/// by degree so hubs move less than leaves.
pub fn link(nodes: &mut [SimNode], links: &[SimLink], distance: f32, strength: f32, alpha: f32, rng: &mut impl Rng) {
    for l in links {
        let (s, t) = (l.source, l.target);
        let x = nonzero(nodes[t].pos.x + nodes[t].vel.x - nodes[s].pos.x - nodes[s].vel.x, rng);
        let y = nonzero(nodes[t].pos.y + nodes[t].vel.y - nodes[s].pos.y - nodes[s].vel.y, rng);
        let len = (x * x + y * y).sqrt();
        let k = (len - distance) / len * alpha * strength;
        let d = Vec2::new(x * k, y * k);
        nodes[t].vel -= d * l.bias;
        nodes[s].vel += d * (1.0 - l.bias);
    }
}

/// Inverse-distance repulsion between every ordered pair (negative `strength` repels).
pub fn charge(nodes: &mut [SimNode], strength: f32, alpha: f32, rng: &mut impl Rng) {
    let n = nodes.len();
    for i in 0..n {
        let mut acc = Vec2::ZERO;
        for j in 0..n {
            if i == j {
                continue;
            }
            let x = nonzero(nodes[j].pos.x - nodes[i].pos.x, rng);
            let y = nonzero(nodes[j].pos.y - nodes[i].pos.y, rng);
            let mut l = x * x + y * y;
            // Clamp the near field so coincident nodes don't explode apart
            if l < 1.0 {
                l = l.sqrt();
            }
            let w = strength * alpha / l;
            acc += Vec2::new(x * w, y * w);
        }
        nodes[i].vel += acc;
    }
}

/// Translate the whole system so its mean position sits on `center`.
pub fn center(nodes: &mut [SimNode], center: egui::Pos2) {
    if nodes.is_empty() {
        return;
    }
    let n = nodes.len() as f32;
    let sum = nodes.iter().fold(Vec2::ZERO, |acc, node| acc + node.pos.to_vec2());
    let shift = sum / n - center.to_vec2();
    for node in nodes.iter_mut() {
        node.pos -= shift;
    }
}

/// Pairwise exclusion: overlapping circles (judged at their predicted positions) are pushed
/// apart, the smaller circle taking the larger share of the push.
pub fn collide(nodes: &mut [SimNode], rng: &mut impl Rng) {
    let n = nodes.len();
    for i in 0..n {
        let ri = nodes[i].radius;
        let ri2 = ri * ri;
        let pi = nodes[i].pos + nodes[i].vel;
        for j in (i + 1)..n {
            let rj = nodes[j].radius;
            let r = ri + rj;
            let pj = nodes[j].pos + nodes[j].vel;
            let mut x = pi.x - pj.x;
            let mut y = pi.y - pj.y;
            let mut l = x * x + y * y;
            if l >= r * r {
                continue;
            }
            if x == 0.0 {
                x = jiggle(rng);
                l += x * x;
            }
            if y == 0.0 {
                y = jiggle(rng);
                l += y * y;
            }
            let len = l.sqrt();
            let k = (r - len) / len;
            let d = Vec2::new(x * k, y * k);
            let share = rj * rj / (ri2 + rj * rj);
            nodes[i].vel += d * share;
            nodes[j].vel -= d * (1.0 - share);
        }
    }
}
