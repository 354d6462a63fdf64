pub mod controller;
pub mod highlight;
pub mod search;
pub mod viewport;

pub use controller::{
    reduce, Hover, InteractionController, InteractionEvent, InteractionState, LayoutCommand, PointerState,
};
pub use highlight::{EdgeLook, Highlight, NodeLook};
pub use search::SearchState;
pub use viewport::ViewTransform;
