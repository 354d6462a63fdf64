//! Pointer, selection, search and view state as an explicit state machine.
//!
//! [`reduce`] is pure: it maps the current state plus one event to the next state and a list
//! of [`LayoutCommand`]s. [`InteractionController`] owns the state and forwards those commands
//! to the layout engine through its pin API.

use std::time::{Duration, Instant};

use egui::{Pos2, Vec2};

use crate::graph_utils::model::{EntryId, RelationshipId};
use crate::layout::{LayoutEngine, DRAG_ALPHA_TARGET};
use crate::query::GraphSnapshot;

use super::highlight::Highlight;
use super::search::SearchState;
use super::viewport::ViewTransform;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hover {
    Node(EntryId),
    Link(RelationshipId),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PointerState {
    #[default]
    Idle,
    HoveringNode(EntryId),
    HoveringLink(RelationshipId),
    /// `prior` is restored when the drag ends; it tracks what the pointer passed over meanwhile.
    Dragging { node: EntryId, prior: Option<Hover> },
}

impl PointerState {
    fn from_hover(hover: Option<Hover>) -> Self {
        match hover {
            None => PointerState::Idle,
            Some(Hover::Node(id)) => PointerState::HoveringNode(id),
            Some(Hover::Link(id)) => PointerState::HoveringLink(id),
        }
    }

    pub fn hover(&self) -> Option<Hover> {
        match *self {
            PointerState::Idle => None,
            PointerState::HoveringNode(id) => Some(Hover::Node(id)),
            PointerState::HoveringLink(id) => Some(Hover::Link(id)),
            PointerState::Dragging { prior, .. } => prior,
        }
    }

    /// Node whose neighbourhood is emphasised: the hovered node, or the one being dragged.
    pub fn focus_node(&self) -> Option<EntryId> {
        match *self {
            PointerState::HoveringNode(id) | PointerState::Dragging { node: id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn focus_link(&self) -> Option<RelationshipId> {
        match *self {
            PointerState::HoveringLink(id) => Some(id),
            _ => None,
        }
    }

    pub fn dragging(&self) -> Option<EntryId> {
        match *self {
            PointerState::Dragging { node, .. } => Some(node),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct InteractionState {
    pub pointer: PointerState,
    /// Node whose detail panel is open. Independent of hover.
    pub selected: Option<EntryId>,
    pub search: SearchState,
    pub view: ViewTransform,
}

impl InteractionState {
    pub fn with_debounce(debounce: Duration) -> Self {
        Self { search: SearchState::new(debounce), ..Default::default() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InteractionEvent {
    PointerEnterNode(EntryId),
    PointerEnterLink(RelationshipId),
    PointerLeave,
    Click(EntryId),
    CloseDetail,
    DragStart(EntryId),
    /// Pointer position in world coordinates.
    DragMove(Pos2),
    DragEnd,
    SearchInput { text: String, at: Instant },
    SearchClear,
    Tick(Instant),
    /// Multiply scale by `factor` around the screen point `anchor`.
    Zoom { factor: f32, anchor: Pos2 },
    Pan(Vec2),
    ZoomIn { anchor: Pos2 },
    ZoomOut { anchor: Pos2 },
    ResetView,
    /// A fresh query result replaced the displayed graph.
    GraphReplaced,
}

/// Side effects on the layout engine requested by a transition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LayoutCommand {
    /// Pin the node where it currently is.
    PinInPlace(EntryId),
    Pin(EntryId, Pos2),
    Unpin(EntryId),
    AlphaTarget(f32),
}

pub fn reduce(
    mut state: InteractionState,
    event: &InteractionEvent,
    graph: &GraphSnapshot,
) -> (InteractionState, Vec<LayoutCommand>) {
    let mut commands = Vec::new();
    match event {
        InteractionEvent::PointerEnterNode(id) => {
            if graph.contains(*id) {
                set_hover(&mut state.pointer, Some(Hover::Node(*id)));
            }
        }
        InteractionEvent::PointerEnterLink(id) => {
            if graph.edge(*id).is_some() {
                set_hover(&mut state.pointer, Some(Hover::Link(*id)));
            }
        }
        InteractionEvent::PointerLeave => set_hover(&mut state.pointer, None),
        InteractionEvent::Click(id) => {
            if graph.contains(*id) {
                state.selected = Some(*id);
            }
        }
        InteractionEvent::CloseDetail => state.selected = None,
        InteractionEvent::DragStart(id) => {
            if graph.contains(*id) && state.pointer.dragging().is_none() {
                state.pointer = PointerState::Dragging { node: *id, prior: state.pointer.hover() };
                commands.push(LayoutCommand::AlphaTarget(DRAG_ALPHA_TARGET));
                commands.push(LayoutCommand::PinInPlace(*id));
            }
        }
        InteractionEvent::DragMove(to) => {
            if let Some(node) = state.pointer.dragging() {
                commands.push(LayoutCommand::Pin(node, *to));
            }
        }
        InteractionEvent::DragEnd => {
            if let PointerState::Dragging { node, prior } = state.pointer {
                state.pointer = PointerState::from_hover(prior);
                commands.push(LayoutCommand::AlphaTarget(0.0));
                commands.push(LayoutCommand::Unpin(node));
            }
        }
        InteractionEvent::SearchInput { text, at } => state.search.type_text(text, *at),
        InteractionEvent::SearchClear => state.search.clear(),
        InteractionEvent::Tick(now) => {
            state.search.poll(*now, graph);
        }
        InteractionEvent::Zoom { factor, anchor } => state.view.zoom_by(*factor, *anchor),
        InteractionEvent::Pan(delta) => state.view.pan(*delta),
        InteractionEvent::ZoomIn { anchor } => state.view.zoom_in(*anchor),
        InteractionEvent::ZoomOut { anchor } => state.view.zoom_out(*anchor),
        InteractionEvent::ResetView => state.view.reset(),
        InteractionEvent::GraphReplaced => {
            prune_missing(&mut state, graph);
            state.search.refresh(graph);
        }
    }
    (state, commands)
}

fn set_hover(pointer: &mut PointerState, hover: Option<Hover>) {
    match pointer {
        PointerState::Dragging { prior, .. } => *prior = hover,
        _ => *pointer = PointerState::from_hover(hover),
    }
}

fn prune_missing(state: &mut InteractionState, graph: &GraphSnapshot) {
    if state.selected.is_some_and(|id| !graph.contains(id)) {
        state.selected = None;
    }
    let hover_alive = |h: Option<Hover>| match h {
        Some(Hover::Node(id)) if !graph.contains(id) => None,
        Some(Hover::Link(id)) if graph.edge(id).is_none() => None,
        other => other,
    };
    state.pointer = match state.pointer {
        PointerState::Dragging { node, prior } if graph.contains(node) => {
            PointerState::Dragging { node, prior: hover_alive(prior) }
        }
        PointerState::Dragging { prior, .. } => PointerState::from_hover(hover_alive(prior)),
        other => PointerState::from_hover(hover_alive(other.hover())),
    };
}

/// Owns the interaction state and applies transitions to a layout engine.
#[derive(Debug, Default)]
pub struct InteractionController {
    state: InteractionState,
}

impl InteractionController {
    pub fn new(state: InteractionState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn view(&self) -> ViewTransform {
        self.state.view
    }

    pub fn set_view(&mut self, view: ViewTransform) {
        self.state.view = view.sanitized();
    }

    pub fn dispatch(&mut self, event: InteractionEvent, graph: &GraphSnapshot, layout: &mut LayoutEngine) {
        let (next, commands) = reduce(std::mem::take(&mut self.state), &event, graph);
        self.state = next;
        for cmd in commands {
            apply(layout, cmd);
        }
    }

    pub fn highlight(&self, graph: &GraphSnapshot) -> Highlight {
        Highlight::compute(&self.state, graph)
    }
}

pub fn apply(layout: &mut LayoutEngine, cmd: LayoutCommand) {
    match cmd {
        LayoutCommand::PinInPlace(id) => {
            if let Some(pos) = layout.position(id) {
                layout.set_pin(id, Some(pos));
            }
        }
        LayoutCommand::Pin(id, pos) => {
            layout.set_pin(id, Some(pos));
        }
        LayoutCommand::Unpin(id) => {
            layout.set_pin(id, None);
        }
        LayoutCommand::AlphaTarget(t) => layout.set_alpha_target(t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_utils::model::{EntryType, Relationship, RelationshipType};
    use crate::query::GraphNode;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn graph() -> (GraphSnapshot, Vec<EntryId>, RelationshipId) {
        let ids: Vec<EntryId> = (0..3).map(|_| Uuid::now_v7()).collect();
        let nodes = ids.iter().map(|id| GraphNode {
            id: *id,
            title: "n".into(),
            content: String::new(),
            entry_type: EntryType::Article,
            tags: vec![],
            created_at: OffsetDateTime::UNIX_EPOCH,
        });
        let rel = Relationship {
            id: Uuid::now_v7(),
            rel_type: RelationshipType::RelatedTo,
            description: None,
            from_entry_id: ids[0],
            to_entry_id: ids[1],
            owner_id: Uuid::nil(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let rel_id = rel.id;
        (GraphSnapshot::induce(nodes, &[rel]), ids, rel_id)
    }

    #[test]
    fn drag_round_trip_restores_hover_and_unpins() {
        let (g, ids, _) = graph();
        let s = InteractionState::default();
        let (s, _) = reduce(s, &InteractionEvent::PointerEnterNode(ids[0]), &g);
        let (s, cmds) = reduce(s, &InteractionEvent::DragStart(ids[0]), &g);
        assert_eq!(
            cmds,
            vec![LayoutCommand::AlphaTarget(DRAG_ALPHA_TARGET), LayoutCommand::PinInPlace(ids[0])]
        );
        let (s, cmds) = reduce(s, &InteractionEvent::DragMove(Pos2::new(5.0, 6.0)), &g);
        assert_eq!(cmds, vec![LayoutCommand::Pin(ids[0], Pos2::new(5.0, 6.0))]);
        let (s, cmds) = reduce(s, &InteractionEvent::DragEnd, &g);
        assert_eq!(cmds, vec![LayoutCommand::AlphaTarget(0.0), LayoutCommand::Unpin(ids[0])]);
        assert_eq!(s.pointer, PointerState::HoveringNode(ids[0]));
    }

    #[test]
    fn hover_events_while_dragging_only_update_prior() {
        let (g, ids, rel) = graph();
        let (s, _) = reduce(InteractionState::default(), &InteractionEvent::DragStart(ids[1]), &g);
        let (s, _) = reduce(s, &InteractionEvent::PointerEnterLink(rel), &g);
        assert_eq!(s.pointer.dragging(), Some(ids[1]));
        let (s, _) = reduce(s, &InteractionEvent::DragEnd, &g);
        assert_eq!(s.pointer, PointerState::HoveringLink(rel));
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let (g, _, _) = graph();
        let ghost = Uuid::now_v7();
        let (s, cmds) = reduce(InteractionState::default(), &InteractionEvent::DragStart(ghost), &g);
        assert!(cmds.is_empty());
        assert_eq!(s.pointer, PointerState::Idle);
        let (s, _) = reduce(s, &InteractionEvent::Click(ghost), &g);
        assert_eq!(s.selected, None);
    }

    #[test]
    fn graph_replacement_drops_vanished_selection() {
        let (g, ids, _) = graph();
        let (s, _) = reduce(InteractionState::default(), &InteractionEvent::Click(ids[2]), &g);
        let (s, _) = reduce(s, &InteractionEvent::PointerEnterNode(ids[2]), &g);
        let (s, _) = reduce(s, &InteractionEvent::GraphReplaced, &GraphSnapshot::default());
        assert_eq!(s.selected, None);
        assert_eq!(s.pointer, PointerState::Idle);
    }
}
