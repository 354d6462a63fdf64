use std::sync::{Arc, Mutex};

use knowledge_vault::api::identity::{LocalIdentity, MIN_HASH_COST};
use knowledge_vault::api::service::{ApiOp, ApiReply, VaultService};
use knowledge_vault::api::{error_body, http_status};
use knowledge_vault::graph_utils::error::VaultError;
use knowledge_vault::graph_utils::graph::{shared, GraphStore, StorePolicy};
use knowledge_vault::graph_utils::model::{
    CreateEntryInput, CreateRelationshipInput, EntryFilter, EntryId, EntryType, RelationshipType,
};

type Service = VaultService<LocalIdentity>;

fn service_with(policy: StorePolicy) -> Service {
    let identity = LocalIdentity::new().with_hash_cost(MIN_HASH_COST);
    VaultService::new(shared(GraphStore::with_policy(policy)), Arc::new(Mutex::new(identity)))
}

fn service() -> Service {
    service_with(StorePolicy::default())
}

fn signup(svc: &Service, email: &str) -> String {
    let op = ApiOp::Signup { email: email.into(), password: "hunter22".into(), name: None };
    match svc.execute(None, op).expect("signup") {
        ApiReply::Auth(auth) => auth.token,
        other => panic!("unexpected reply {:?}", other),
    }
}

fn create(svc: &Service, token: &str, title: &str) -> EntryId {
    let input = CreateEntryInput::new(title, "", EntryType::Article);
    match svc.execute(Some(token), ApiOp::CreateEntry { input }).expect("create entry") {
        ApiReply::Entry(Some(view)) => view.entry.id,
        other => panic!("unexpected reply {:?}", other),
    }
}

fn list(svc: &Service, token: &str) -> Vec<EntryId> {
    let op = ApiOp::Entries { search: None, tag_names: Vec::new(), entry_type: None };
    match svc.execute(Some(token), op).expect("list entries") {
        ApiReply::Entries(views) => views.into_iter().map(|v| v.entry.id).collect(),
        other => panic!("unexpected reply {:?}", other),
    }
}

#[test]
fn owner_scoped_ops_require_a_session() {
    let svc = service();
    let err = svc.execute(None, ApiOp::Tags).unwrap_err();
    assert!(err.is_auth_failure());
    assert_eq!(http_status(&err), 401);

    let err = svc.execute(Some("not-a-token"), ApiOp::Relationships).unwrap_err();
    assert_eq!(err.code(), "UNAUTHENTICATED");
    assert!(svc.execute(None, ApiOp::Me).is_err());
}

#[test]
fn signup_then_login_resolves_the_same_owner() {
    let svc = service();
    let first = signup(&svc, "Ada@Example.com");
    let owner = svc.owner(Some(&first)).unwrap();

    let reply = svc
        .execute(None, ApiOp::Login { email: "ada@example.com".into(), password: "hunter22".into() })
        .unwrap();
    let ApiReply::Auth(auth) = reply else { panic!("expected auth payload") };
    assert_ne!(auth.token, first);
    assert_eq!(auth.user.id, owner);
    assert_eq!(auth.user.email, "ada@example.com");

    let bad = svc
        .execute(None, ApiOp::Login { email: "ada@example.com".into(), password: "wrong-password".into() })
        .unwrap_err();
    assert!(bad.is_auth_failure());

    let dup = svc
        .execute(None, ApiOp::Signup { email: "ada@example.com".into(), password: "hunter22".into(), name: None })
        .unwrap_err();
    assert!(matches!(dup, VaultError::Conflict(_)));
    assert_eq!(http_status(&dup), 409);
}

#[test]
fn short_password_is_a_validation_error() {
    let svc = service();
    let err = svc
        .execute(None, ApiOp::Signup { email: "bob@example.com".into(), password: "abc".into(), name: None })
        .unwrap_err();
    assert_eq!(http_status(&err), 400);
}

#[test]
fn owners_never_see_each_other() {
    let svc = service();
    let alice = signup(&svc, "alice@example.com");
    let bob = signup(&svc, "bob@example.com");
    let a1 = create(&svc, &alice, "Alice private");
    let b1 = create(&svc, &bob, "Bob private");

    assert_eq!(list(&svc, &alice), vec![a1]);
    assert_eq!(list(&svc, &bob), vec![b1]);

    match svc.execute(Some(&bob), ApiOp::Entry { id: a1 }).unwrap() {
        ApiReply::Entry(None) => {}
        other => panic!("bob should not see alice's entry: {:?}", other),
    }
    let err = svc.execute(Some(&bob), ApiOp::DeleteEntry { id: a1 }).unwrap_err();
    assert_eq!(http_status(&err), 404);
    assert_eq!(list(&svc, &alice), vec![a1]);

    let ApiReply::Graph(graph) = svc.execute(Some(&bob), ApiOp::Graph { filter: EntryFilter::all() }).unwrap() else {
        panic!("expected graph");
    };
    assert_eq!(graph.node_count(), 1);
    assert!(graph.contains(b1));
}

#[test]
fn cross_owner_relationship_is_rejected_when_enforced() {
    let svc = service();
    let alice = signup(&svc, "alice@example.com");
    let bob = signup(&svc, "bob@example.com");
    let mine = create(&svc, &alice, "Mine");
    let theirs = create(&svc, &bob, "Theirs");

    let input = CreateRelationshipInput::new(mine, theirs, RelationshipType::References);
    let err = svc.execute(Some(&alice), ApiOp::CreateRelationship { input }).unwrap_err();
    assert_eq!(http_status(&err), 404);
}

#[test]
fn cross_owner_relationship_is_allowed_when_loose() {
    let svc = service_with(StorePolicy { enforce_endpoint_ownership: false });
    let alice = signup(&svc, "alice@example.com");
    let bob = signup(&svc, "bob@example.com");
    let mine = create(&svc, &alice, "Mine");
    let theirs = create(&svc, &bob, "Theirs");

    let input = CreateRelationshipInput::new(mine, theirs, RelationshipType::References);
    let ApiReply::Relationship(rel) = svc.execute(Some(&alice), ApiOp::CreateRelationship { input }).unwrap() else {
        panic!("expected relationship");
    };
    // the foreign endpoint is not in alice's filtered set, so her graph drops the edge
    let ApiReply::Graph(graph) = svc.execute(Some(&alice), ApiOp::Graph { filter: EntryFilter::all() }).unwrap() else {
        panic!("expected graph");
    };
    assert!(graph.edge(rel.id).is_none());
    let ApiReply::Relationships(rels) = svc.execute(Some(&bob), ApiOp::Relationships).unwrap() else {
        panic!("expected relationships");
    };
    assert!(rels.is_empty());
}

#[test]
fn delete_entry_cascades_through_the_service() {
    let svc = service();
    let token = signup(&svc, "carol@example.com");
    let a = create(&svc, &token, "A");
    let b = create(&svc, &token, "B");
    let input = CreateRelationshipInput::new(a, b, RelationshipType::InspiredBy);
    svc.execute(Some(&token), ApiOp::CreateRelationship { input }).unwrap();

    assert!(matches!(svc.execute(Some(&token), ApiOp::DeleteEntry { id: b }).unwrap(), ApiReply::Deleted(true)));
    let ApiReply::Relationships(rels) = svc.execute(Some(&token), ApiOp::Relationships).unwrap() else {
        panic!("expected relationships");
    };
    assert!(rels.is_empty());
}

#[test]
fn sample_data_loads_for_the_caller() {
    let svc = service();
    let token = signup(&svc, "dave@example.com");
    let reply = svc.execute(Some(&token), ApiOp::LoadSampleData).unwrap();
    assert!(matches!(reply, ApiReply::SampleLoaded { entries: 6, relationships: 6 }));
    assert!(ApiOp::LoadSampleData.is_mutation());

    let op = ApiOp::Entries { search: Some("HOOK".into()), tag_names: Vec::new(), entry_type: None };
    let ApiReply::Entries(views) = svc.execute(Some(&token), op).unwrap() else {
        panic!("expected entries");
    };
    assert!(!views.is_empty());
    assert!(views.iter().all(|v| {
        let title = v.entry.title.to_lowercase();
        title.contains("hook") || v.entry.content.to_lowercase().contains("hook")
    }));
}

#[test]
fn request_bodies_parse_and_errors_serialize() {
    let op = Service::parse_op(r#"{"op":"createEntry","input":{"title":"T","content":"c","type":"BOOKMARK","url":"https://x.dev"}}"#)
        .unwrap();
    assert_eq!(op.name(), "createEntry");
    assert!(op.is_mutation());

    let err = Service::parse_op(r#"{"op":"createRelationship","input":{"fromEntryId":"x"}}"#).unwrap_err();
    assert_eq!(http_status(&err), 400);
    let body = serde_json::to_value(error_body(&err)).unwrap();
    assert_eq!(body["error"]["code"], "BAD_USER_INPUT");
    assert!(body["error"]["message"].as_str().is_some());

    let missing = VaultError::not_found("Entry", "abc");
    let body = serde_json::to_value(error_body(&missing)).unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}
