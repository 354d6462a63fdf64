pub mod forces;
pub mod simulation;

pub use simulation::{
    collision_radius, ForceParams, LayoutEngine, SimLink, SimNode, TickOutcome, ALPHA_MIN, DRAG_ALPHA_TARGET,
};
