pub mod scene;
pub mod style;

pub use scene::{render, CanvasSize, EdgeDrawable, GraphStats, HoverCard, NodeDrawable, Scene};
