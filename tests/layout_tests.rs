use std::collections::HashMap;

use egui::{pos2, Pos2};
use knowledge_vault::graph_utils::graph::GraphStore;
use knowledge_vault::graph_utils::model::{
    CreateEntryInput, CreateRelationshipInput, EntryFilter, EntryId, EntryType, RelationshipType,
};
use knowledge_vault::interaction::{InteractionController, InteractionEvent, InteractionState};
use knowledge_vault::layout::{collision_radius, LayoutEngine, ALPHA_MIN};
use knowledge_vault::query::{GraphNode, GraphSnapshot, QueryEngine};
use time::OffsetDateTime;
use uuid::Uuid;

const CENTER: Pos2 = Pos2::new(400.0, 300.0);

/// a -> b -> c
fn chain() -> (GraphSnapshot, [EntryId; 3]) {
    let owner = Uuid::new_v4();
    let mut store = GraphStore::new();
    let mut ids = [Uuid::nil(); 3];
    for (slot, title) in ids.iter_mut().zip(["Alpha", "Beta", "Gamma"]) {
        *slot = store.create_entry(owner, CreateEntryInput::new(title, "", EntryType::Article)).unwrap().id;
    }
    for pair in ids.windows(2) {
        store
            .create_relationship(owner, CreateRelationshipInput::new(pair[0], pair[1], RelationshipType::BuildsOn))
            .unwrap();
    }
    (QueryEngine::snapshot(&store, owner, &EntryFilter::all()).unwrap(), ids)
}

/// One hub linked to `leaves` spokes.
fn star(leaves: usize) -> GraphSnapshot {
    let owner = Uuid::new_v4();
    let mut store = GraphStore::new();
    let hub = store.create_entry(owner, CreateEntryInput::new("hub", "", EntryType::Article)).unwrap().id;
    for i in 0..leaves {
        let leaf = store
            .create_entry(owner, CreateEntryInput::new(format!("leaf {}", i), "", EntryType::Article))
            .unwrap()
            .id;
        store
            .create_relationship(owner, CreateRelationshipInput::new(hub, leaf, RelationshipType::RelatedTo))
            .unwrap();
    }
    QueryEngine::snapshot(&store, owner, &EntryFilter::all()).unwrap()
}

fn loose_nodes(n: usize) -> GraphSnapshot {
    let nodes = (0..n).map(|i| GraphNode {
        id: Uuid::from_u128(i as u128 + 1),
        title: format!("node {}", i),
        content: String::new(),
        entry_type: EntryType::Bookmark,
        tags: Vec::new(),
        created_at: OffsetDateTime::UNIX_EPOCH,
    });
    GraphSnapshot::induce(nodes, &[])
}

fn assert_no_overlap(graph: &GraphSnapshot, engine: &LayoutEngine) {
    let nodes = graph.nodes();
    for (i, a) in nodes.iter().enumerate() {
        for b in &nodes[i + 1..] {
            let d = engine.position(a.id).unwrap().distance(engine.position(b.id).unwrap());
            let min = collision_radius(&a.title) + collision_radius(&b.title);
            assert!(d >= min, "{} and {} are {} apart, need {}", a.title, b.title, d, min);
        }
    }
}

#[test]
fn three_node_chain_converges_without_overlap() {
    let (graph, _) = chain();
    let mut engine = LayoutEngine::new(&graph, CENTER, 42);
    let ticks = engine.run_until_settled(1_000);
    assert!(engine.is_settled());
    assert!(engine.alpha() < ALPHA_MIN);
    assert!(ticks < 400, "took {} ticks", ticks);
    assert_no_overlap(&graph, &engine);
}

#[test]
fn same_seed_same_layout() {
    let (graph, ids) = chain();
    let mut a = LayoutEngine::new(&graph, CENTER, 42);
    let mut b = LayoutEngine::new(&graph, CENTER, 42);
    a.run_until_settled(1_000);
    b.run_until_settled(1_000);
    for id in ids {
        assert_eq!(a.position(id), b.position(id));
    }
}

#[test]
fn disconnected_nodes_spread_apart() {
    let graph = loose_nodes(8);
    let mut engine = LayoutEngine::new(&graph, CENTER, 3);
    engine.run_until_settled(1_000);
    assert!(engine.is_settled());
    assert_no_overlap(&graph, &engine);
}

#[test]
fn star_leaves_settle_without_overlap() {
    let graph = star(12);
    let mut engine = LayoutEngine::new(&graph, CENTER, 11);
    engine.run_until_settled(1_000);
    assert!(engine.is_settled());
    assert_no_overlap(&graph, &engine);
}

#[test]
fn released_node_holds_for_one_tick_then_moves() {
    let (graph, [_, dragged, _]) = chain();
    let mut engine = LayoutEngine::new(&graph, CENTER, 42);
    engine.run_until_settled(1_000);
    let mut controller = InteractionController::new(InteractionState::default());

    let target = pos2(900.0, 900.0);
    controller.dispatch(InteractionEvent::DragStart(dragged), &graph, &mut engine);
    assert!(engine.node(dragged).unwrap().is_pinned());
    assert_eq!(engine.alpha_target(), 0.3);
    assert!(!engine.is_settled());

    controller.dispatch(InteractionEvent::DragMove(target), &graph, &mut engine);
    engine.tick();
    assert_eq!(engine.position(dragged), Some(target));

    controller.dispatch(InteractionEvent::DragEnd, &graph, &mut engine);
    assert_eq!(engine.alpha_target(), 0.0);
    engine.tick();
    assert_eq!(engine.position(dragged), Some(target));
    assert!(!engine.node(dragged).unwrap().is_pinned());

    engine.tick();
    assert_ne!(engine.position(dragged), Some(target));
}

#[test]
fn pinning_unknown_node_is_refused() {
    let (graph, _) = chain();
    let mut engine = LayoutEngine::new(&graph, CENTER, 1);
    assert!(!engine.set_pin(Uuid::new_v4(), Some(CENTER)));
}

#[test]
fn large_graph_skips_frames_but_emits_the_settled_one() {
    let graph = loose_nodes(101);
    let mut engine = LayoutEngine::new(&graph, CENTER, 9);
    assert_eq!(engine.alpha(), 0.1);
    assert!(engine.params().throttle);

    let mut outcomes = Vec::new();
    while !engine.is_settled() && outcomes.len() < 2_000 {
        outcomes.push(engine.tick());
    }
    let last = outcomes.last().copied().unwrap();
    assert!(last.settled && last.emitted);
    assert!(!outcomes[0].emitted);
    assert!(outcomes[1].emitted);
    let emitted = outcomes.iter().filter(|o| o.emitted).count();
    assert!(emitted < outcomes.len());
}

#[test]
fn small_graph_emits_every_frame() {
    let (graph, _) = chain();
    let mut engine = LayoutEngine::new(&graph, CENTER, 42);
    for _ in 0..10 {
        assert!(engine.tick().emitted);
    }
}

#[test]
fn warm_start_keeps_saved_positions() {
    let (graph, [a, b, c]) = chain();
    let warm = HashMap::from([(a, pos2(10.0, 20.0)), (b, pos2(-50.0, 70.0))]);
    let engine = LayoutEngine::with_positions(&graph, CENTER, 42, &warm);
    assert_eq!(engine.position(a), Some(pos2(10.0, 20.0)));
    assert_eq!(engine.position(b), Some(pos2(-50.0, 70.0)));
    let fresh = engine.position(c).unwrap();
    assert!(fresh.distance(CENTER) < 50.0);
}

#[test]
fn reheat_restarts_a_cooled_simulation() {
    let (graph, _) = chain();
    let mut engine = LayoutEngine::new(&graph, CENTER, 42);
    engine.run_until_settled(1_000);
    assert!(engine.is_settled());
    engine.reheat();
    assert!(!engine.is_settled());
    assert!(engine.tick().emitted);
}
