use knowledge_vault::graph_utils::error::VaultError;
use knowledge_vault::graph_utils::graph::{GraphStore, StorePolicy};
use knowledge_vault::graph_utils::model::{
    CreateEntryInput, CreateRelationshipInput, EntryFilter, EntryType, RelationshipType, UpdateEntryInput,
};
use uuid::Uuid;

fn new_store() -> GraphStore {
    GraphStore::new()
}

fn article(title: &str) -> CreateEntryInput {
    CreateEntryInput::new(title, format!("{} body", title), EntryType::Article)
}

#[test]
fn entries_list_most_recently_touched_first() {
    let mut store = new_store();
    let owner = Uuid::new_v4();
    let a = store.create_entry(owner, article("First")).expect("create first");
    let b = store.create_entry(owner, article("Second")).expect("create second");
    let c = store.create_entry(owner, article("Third")).expect("create third");

    let ids: Vec<_> = store.list_entries(owner, &EntryFilter::all()).iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![c.id, b.id, a.id]);

    store
        .update_entry(owner, a.id, UpdateEntryInput { content: Some("edited".into()), ..Default::default() })
        .expect("update first");
    let ids: Vec<_> = store.list_entries(owner, &EntryFilter::all()).iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![a.id, c.id, b.id]);
}

#[test]
fn delete_entry_cascades_to_relationships_in_both_directions() {
    let mut store = new_store();
    let owner = Uuid::new_v4();
    let hub = store.create_entry(owner, article("Hub")).unwrap();
    let left = store.create_entry(owner, article("Left")).unwrap();
    let right = store.create_entry(owner, article("Right")).unwrap();
    store
        .create_relationship(owner, CreateRelationshipInput::new(hub.id, left.id, RelationshipType::References))
        .unwrap();
    store
        .create_relationship(owner, CreateRelationshipInput::new(right.id, hub.id, RelationshipType::BuildsOn))
        .unwrap();
    let survivor = store
        .create_relationship(owner, CreateRelationshipInput::new(left.id, right.id, RelationshipType::RelatedTo))
        .unwrap();

    let removed = store.delete_entry(owner, hub.id).expect("delete hub");
    assert_eq!(removed, 2);

    let remaining = store.relationships(owner);
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, survivor.id);
    assert!(remaining.iter().all(|r| r.from_entry_id != hub.id && r.to_entry_id != hub.id));
    assert!(store.relationships_from(hub.id).is_empty());
    assert!(store.relationships_to(hub.id).is_empty());
    assert!(matches!(store.entry(owner, hub.id), Err(VaultError::NotFound { .. })));
}

#[test]
fn another_owner_cannot_see_or_touch_entries() {
    let mut store = new_store();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let a1 = store.create_entry(alice, article("Alice one")).unwrap();
    let a2 = store.create_entry(alice, article("Alice two")).unwrap();
    let rel = store
        .create_relationship(alice, CreateRelationshipInput::new(a1.id, a2.id, RelationshipType::References))
        .unwrap();
    store.create_entry(bob, article("Bob one")).unwrap();

    assert!(store.list_entries(bob, &EntryFilter::all()).iter().all(|e| e.owner_id == bob));
    assert!(store.relationships(bob).is_empty());
    assert_eq!(store.owner_entry_count(alice), 2);

    let update = UpdateEntryInput { title: Some("hijack".into()), ..Default::default() };
    assert!(matches!(store.update_entry(bob, a1.id, update), Err(VaultError::NotFound { .. })));
    assert!(matches!(store.delete_entry(bob, a1.id), Err(VaultError::NotFound { .. })));
    assert!(matches!(store.delete_relationship(bob, rel.id), Err(VaultError::NotFound { .. })));
    assert!(store.entry_view(bob, a1.id).is_err());

    // alice's data is untouched
    assert_eq!(store.entry(alice, a1.id).unwrap().title, "Alice one");
    assert_eq!(store.relationships(alice).len(), 1);
}

#[test]
fn tag_names_replace_the_whole_set_and_reuse_existing_tags() {
    let mut store = new_store();
    let owner = Uuid::new_v4();
    let e = store
        .create_entry(owner, article("Tagged").with_tags(["react", "hooks", "react"]))
        .unwrap();
    assert_eq!(store.tag_names_of(e.id), vec!["hooks", "react"]);
    assert_eq!(store.tag_count(), 2);

    let react_id = store.tags().into_iter().find(|t| t.name == "react").unwrap().id;
    let other = store.create_entry(owner, article("Other").with_tags(["react"])).unwrap();
    assert_eq!(store.tags_of(other.id)[0].id, react_id);
    assert_eq!(store.tag_count(), 2);

    store
        .update_entry(
            owner,
            e.id,
            UpdateEntryInput { tag_names: Some(vec!["typescript".into()]), ..Default::default() },
        )
        .unwrap();
    assert_eq!(store.tag_names_of(e.id), vec!["typescript"]);
    // vocabulary is never pruned
    assert_eq!(store.tag_count(), 3);

    // None leaves tags alone
    store
        .update_entry(owner, e.id, UpdateEntryInput { title: Some("Renamed".into()), ..Default::default() })
        .unwrap();
    assert_eq!(store.tag_names_of(e.id), vec!["typescript"]);
}

#[test]
fn tag_vocabulary_is_shared_across_owners() {
    let mut store = new_store();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let a = store.create_entry(alice, article("A").with_tags(["rust"])).unwrap();
    let b = store.create_entry(bob, article("B").with_tags(["rust"])).unwrap();
    assert_eq!(store.tag_count(), 1);
    assert_eq!(store.tags_of(a.id)[0].id, store.tags_of(b.id)[0].id);

    let tagged = EntryFilter::all().tagged(["rust"]);
    assert_eq!(store.list_entries(alice, &tagged).len(), 1);
    assert_eq!(store.list_entries(bob, &tagged).len(), 1);
}

#[test]
fn create_tag_is_find_or_create() {
    let mut store = new_store();
    let first = store.create_tag("design", Some("#8b5cf6".into())).unwrap();
    let again = store.create_tag(" design ", Some("#000000".into())).unwrap();
    assert_eq!(first.id, again.id);
    assert_eq!(again.color.as_deref(), Some("#8b5cf6"));
    assert!(matches!(store.create_tag("  ", None), Err(VaultError::Validation(_))));
}

#[test]
fn changing_type_keeps_language_and_url() {
    let mut store = new_store();
    let owner = Uuid::new_v4();
    let e = store
        .create_entry(
            owner,
            CreateEntryInput::new("Snippet", "fn main() {}", EntryType::CodeSnippet).with_language("rust"),
        )
        .unwrap();
    let updated = store
        .update_entry(owner, e.id, UpdateEntryInput { entry_type: Some(EntryType::Article), ..Default::default() })
        .unwrap();
    assert_eq!(updated.entry_type, EntryType::Article);
    assert_eq!(updated.language.as_deref(), Some("rust"));
    assert!(updated.updated_at > e.updated_at);
    assert_eq!(updated.created_at, e.created_at);
}

#[test]
fn blank_title_is_rejected() {
    let mut store = new_store();
    let owner = Uuid::new_v4();
    let err = store.create_entry(owner, article("   ")).unwrap_err();
    assert_eq!(err.code(), "BAD_USER_INPUT");
    assert_eq!(store.entry_count(), 0);
}

#[test]
fn endpoint_ownership_enforced_by_default() {
    let mut store = new_store();
    assert!(store.policy().enforce_endpoint_ownership);
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let mine = store.create_entry(alice, article("Mine")).unwrap();
    let theirs = store.create_entry(bob, article("Theirs")).unwrap();

    let err = store
        .create_relationship(alice, CreateRelationshipInput::new(mine.id, theirs.id, RelationshipType::RelatedTo))
        .unwrap_err();
    assert!(matches!(err, VaultError::NotFound { .. }));
    assert_eq!(store.relationship_count(), 0);
}

#[test]
fn loose_policy_accepts_foreign_endpoints() {
    let mut store = GraphStore::with_policy(StorePolicy { enforce_endpoint_ownership: false });
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let mine = store.create_entry(alice, article("Mine")).unwrap();
    let theirs = store.create_entry(bob, article("Theirs")).unwrap();

    let rel = store
        .create_relationship(alice, CreateRelationshipInput::new(mine.id, theirs.id, RelationshipType::RelatedTo))
        .expect("loose policy allows cross-owner endpoints");
    assert_eq!(rel.owner_id, alice);
    assert!(store.relationships(bob).is_empty());

    // still NotFound for an id that does not exist at all
    let err = store
        .create_relationship(alice, CreateRelationshipInput::new(mine.id, Uuid::new_v4(), RelationshipType::RelatedTo))
        .unwrap_err();
    assert!(matches!(err, VaultError::NotFound { .. }));
}

#[test]
fn entry_view_carries_both_relation_directions() {
    let mut store = new_store();
    let owner = Uuid::new_v4();
    let a = store.create_entry(owner, article("A")).unwrap();
    let b = store.create_entry(owner, article("B")).unwrap();
    store
        .create_relationship(
            owner,
            CreateRelationshipInput::new(a.id, b.id, RelationshipType::InspiredBy).described("sparked it"),
        )
        .unwrap();

    let va = store.entry_view(owner, a.id).unwrap();
    assert_eq!(va.from_relations.len(), 1);
    assert_eq!(va.from_relations[0].entry.title, "B");
    assert_eq!(va.from_relations[0].description.as_deref(), Some("sparked it"));
    assert!(va.to_relations.is_empty());

    let vb = store.entry_view(owner, b.id).unwrap();
    assert_eq!(vb.to_relations[0].entry.id, a.id);
}
