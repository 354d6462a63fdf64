pub mod engine;
pub mod loader;

pub use engine::{GraphEdge, GraphNode, GraphSnapshot, QueryEngine, TagBadge};
pub use loader::{QueryLoader, RequestSequencer, Ticket};
