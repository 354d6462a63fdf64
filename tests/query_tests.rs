use std::collections::HashSet;

use knowledge_vault::graph_utils::graph::GraphStore;
use knowledge_vault::graph_utils::model::{
    CreateEntryInput, CreateRelationshipInput, EntryFilter, EntryId, EntryType, RelationshipType,
};
use knowledge_vault::graph_utils::sample::load_sample_data;
use knowledge_vault::query::{GraphSnapshot, QueryEngine};
use proptest::prelude::*;
use uuid::Uuid;

const WORDS: [&str; 5] = ["React", "hooks", "Rust", "graph", "notes"];
const TAGS: [&str; 4] = ["react", "rust", "design", "db"];

#[derive(Clone, Debug)]
struct Seed {
    title: (usize, usize),
    content: usize,
    entry_type: usize,
    tags: Vec<usize>,
}

fn seed_strategy() -> impl Strategy<Value = Seed> {
    (
        (0..WORDS.len(), 0..WORDS.len()),
        0..WORDS.len(),
        0..EntryType::ALL.len(),
        proptest::collection::vec(0..TAGS.len(), 0..3),
    )
        .prop_map(|(title, content, entry_type, tags)| Seed { title, content, entry_type, tags })
}

fn filter_strategy() -> impl Strategy<Value = EntryFilter> {
    (
        proptest::option::of(prop_oneof![
            (0..WORDS.len()).prop_map(|i| WORDS[i].to_string()),
            (0..WORDS.len()).prop_map(|i| WORDS[i].to_uppercase()),
            Just("  ".to_string()),
        ]),
        proptest::collection::vec(0..EntryType::ALL.len(), 0..3),
        proptest::collection::vec(0..TAGS.len(), 0..3),
    )
        .prop_map(|(search, types, tags)| {
            let mut filter = EntryFilter::all();
            filter.search = search;
            for t in types {
                filter = filter.of_type(EntryType::ALL[t]);
            }
            filter.tagged(tags.into_iter().map(|i| TAGS[i]))
        })
}

fn build(seeds: &[Seed], owner: Uuid) -> (GraphStore, Vec<EntryId>) {
    let mut store = GraphStore::new();
    let mut ids = Vec::new();
    for s in seeds {
        let title = format!("{} {}", WORDS[s.title.0], WORDS[s.title.1]);
        let input = CreateEntryInput::new(title, format!("about {}", WORDS[s.content]), EntryType::ALL[s.entry_type])
            .with_tags(s.tags.iter().map(|i| TAGS[*i]));
        ids.push(store.create_entry(owner, input).expect("seed entry").id);
    }
    (store, ids)
}

// Independent statement of the filter semantics.
fn expected(seed: &Seed, filter: &EntryFilter) -> bool {
    let title = format!("{} {}", WORDS[seed.title.0], WORDS[seed.title.1]).to_lowercase();
    let content = format!("about {}", WORDS[seed.content]).to_lowercase();
    let text_ok = match filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => true,
        Some(s) => {
            let s = s.to_lowercase();
            title.contains(&s) || content.contains(&s)
        }
    };
    let type_ok = filter.types.is_empty() || filter.types.contains(&EntryType::ALL[seed.entry_type]);
    let tags_ok = filter.tag_names.is_empty()
        || seed.tags.iter().any(|i| filter.tag_names.iter().any(|n| n == TAGS[*i]));
    text_ok && type_ok && tags_ok
}

proptest! {
    #[test]
    fn filters_and_combine(seeds in proptest::collection::vec(seed_strategy(), 0..12), filter in filter_strategy()) {
        let owner = Uuid::new_v4();
        let (store, ids) = build(&seeds, owner);
        let got: HashSet<EntryId> = store.list_entries(owner, &filter).into_iter().map(|e| e.id).collect();
        let want: HashSet<EntryId> = seeds
            .iter()
            .zip(&ids)
            .filter(|(s, _)| expected(s, &filter))
            .map(|(_, id)| *id)
            .collect();
        prop_assert_eq!(got, want);
    }

    #[test]
    fn snapshot_is_an_induced_subgraph(
        seeds in proptest::collection::vec(seed_strategy(), 1..10),
        pairs in proptest::collection::vec((0usize..10, 0usize..10), 0..15),
        filter in filter_strategy(),
    ) {
        let owner = Uuid::new_v4();
        let (mut store, ids) = build(&seeds, owner);
        for (a, b) in pairs {
            let from = ids[a % ids.len()];
            let to = ids[b % ids.len()];
            store
                .create_relationship(owner, CreateRelationshipInput::new(from, to, RelationshipType::RelatedTo))
                .expect("seed relationship");
        }

        let snap = QueryEngine::snapshot(&store, owner, &filter).expect("snapshot");
        let filtered: HashSet<EntryId> = store.list_entries(owner, &filter).into_iter().map(|e| e.id).collect();
        let nodes: HashSet<EntryId> = snap.nodes().iter().map(|n| n.id).collect();
        prop_assert_eq!(&nodes, &filtered);
        for e in snap.edges() {
            prop_assert!(nodes.contains(&e.source) && nodes.contains(&e.target));
        }
        let expected_edges = store
            .relationships(owner)
            .iter()
            .filter(|r| nodes.contains(&r.from_entry_id) && nodes.contains(&r.to_entry_id))
            .count();
        prop_assert_eq!(snap.edge_count(), expected_edges);
    }
}

#[test]
fn parallel_relationships_stay_distinct_edges() {
    let owner = Uuid::new_v4();
    let mut store = GraphStore::new();
    let a = store.create_entry(owner, CreateEntryInput::new("A", "", EntryType::Article)).unwrap();
    let b = store.create_entry(owner, CreateEntryInput::new("B", "", EntryType::Article)).unwrap();
    let r1 = store
        .create_relationship(owner, CreateRelationshipInput::new(a.id, b.id, RelationshipType::References))
        .unwrap();
    let r2 = store
        .create_relationship(owner, CreateRelationshipInput::new(a.id, b.id, RelationshipType::Contradicts))
        .unwrap();

    let snap = QueryEngine::snapshot(&store, owner, &EntryFilter::all()).unwrap();
    assert_eq!(snap.edge_count(), 2);
    assert!(snap.edge(r1.id).is_some() && snap.edge(r2.id).is_some());
    assert_eq!(snap.degree(a.id), 2);
    assert_eq!(snap.neighbors(a.id), HashSet::from([b.id]));

    // duplicate relationship rows collapse on id
    let rels = store.relationships(owner);
    let doubled: Vec<_> = rels.iter().chain(rels.iter()).cloned().collect();
    let nodes = snap.nodes().to_vec();
    let again = GraphSnapshot::induce(nodes, &doubled);
    assert_eq!(again.edge_count(), 2);
}

#[test]
fn filtered_out_endpoint_drops_the_edge() {
    let owner = Uuid::new_v4();
    let mut store = GraphStore::new();
    let (entries, _) = load_sample_data(&mut store, owner).unwrap();
    assert_eq!(entries.len(), 6);

    let snap = QueryEngine::snapshot(&store, owner, &EntryFilter::all().of_type(EntryType::CodeSnippet)).unwrap();
    assert!(snap.nodes().iter().all(|n| n.entry_type == EntryType::CodeSnippet));
    for e in snap.edges() {
        assert!(snap.contains(e.source) && snap.contains(e.target));
    }

    let full = QueryEngine::snapshot(&store, owner, &EntryFilter::all()).unwrap();
    assert_eq!(full.node_count(), 6);
    assert_eq!(full.edge_count(), 6);
}

#[test]
fn search_matches_title_content_and_tags_ignoring_case() {
    let owner = Uuid::new_v4();
    let mut store = GraphStore::new();
    let by_title = store.create_entry(owner, CreateEntryInput::new("REACT basics", "", EntryType::Article)).unwrap();
    let by_content =
        store.create_entry(owner, CreateEntryInput::new("Hooks", "built on react", EntryType::Article)).unwrap();
    let by_tag = store
        .create_entry(owner, CreateEntryInput::new("Docs", "", EntryType::Bookmark).with_tags(["ReactJS"]))
        .unwrap();
    store.create_entry(owner, CreateEntryInput::new("Rust", "ownership", EntryType::Article)).unwrap();

    let snap = QueryEngine::snapshot(&store, owner, &EntryFilter::all()).unwrap();
    assert_eq!(snap.search_matches("react"), HashSet::from([by_title.id, by_content.id, by_tag.id]));
    assert!(snap.search_matches("   ").is_empty());
}
