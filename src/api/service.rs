//! Typed query/mutation surface over the store, shared by the desktop app and the HTTP server.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::graph_utils::error::{Result, VaultError};
use crate::graph_utils::graph::{lock_store, GraphStore, SharedStore};
use crate::graph_utils::model::{
    CreateEntryInput, CreateRelationshipInput, EntryFilter, EntryId, EntryType, EntryView, OwnerId, Relationship,
    RelationshipId, Tag, UpdateEntryInput,
};
use crate::graph_utils::sample::load_sample_data;
use crate::query::{GraphSnapshot, QueryEngine};

use super::identity::{AuthPayload, IdentityProvider, User};

/// One request. Enum fields are closed: unknown `type` strings fail to deserialize.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ApiOp {
    Signup {
        email: String,
        password: String,
        #[serde(default)]
        name: Option<String>,
    },
    Login {
        email: String,
        password: String,
    },
    Me,
    Entries {
        #[serde(default)]
        search: Option<String>,
        #[serde(default)]
        tag_names: Vec<String>,
        #[serde(default, rename = "type")]
        entry_type: Option<EntryType>,
    },
    Entry {
        id: EntryId,
    },
    Tags,
    Relationships,
    Graph {
        #[serde(default)]
        filter: EntryFilter,
    },
    CreateEntry {
        input: CreateEntryInput,
    },
    UpdateEntry {
        id: EntryId,
        input: UpdateEntryInput,
    },
    DeleteEntry {
        id: EntryId,
    },
    CreateRelationship {
        input: CreateRelationshipInput,
    },
    DeleteRelationship {
        id: RelationshipId,
    },
    CreateTag {
        name: String,
        #[serde(default)]
        color: Option<String>,
    },
    LoadSampleData,
}

impl ApiOp {
    pub fn name(&self) -> &'static str {
        match self {
            ApiOp::Signup { .. } => "signup",
            ApiOp::Login { .. } => "login",
            ApiOp::Me => "me",
            ApiOp::Entries { .. } => "entries",
            ApiOp::Entry { .. } => "entry",
            ApiOp::Tags => "tags",
            ApiOp::Relationships => "relationships",
            ApiOp::Graph { .. } => "graph",
            ApiOp::CreateEntry { .. } => "createEntry",
            ApiOp::UpdateEntry { .. } => "updateEntry",
            ApiOp::DeleteEntry { .. } => "deleteEntry",
            ApiOp::CreateRelationship { .. } => "createRelationship",
            ApiOp::DeleteRelationship { .. } => "deleteRelationship",
            ApiOp::CreateTag { .. } => "createTag",
            ApiOp::LoadSampleData => "loadSampleData",
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            ApiOp::CreateEntry { .. }
                | ApiOp::UpdateEntry { .. }
                | ApiOp::DeleteEntry { .. }
                | ApiOp::CreateRelationship { .. }
                | ApiOp::DeleteRelationship { .. }
                | ApiOp::CreateTag { .. }
                | ApiOp::LoadSampleData
        )
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum ApiReply {
    Auth(AuthPayload),
    User(User),
    Entries(Vec<EntryView>),
    Entry(Option<EntryView>),
    Tags(Vec<Tag>),
    Tag(Tag),
    Relationships(Vec<Relationship>),
    Relationship(Relationship),
    Graph(GraphSnapshot),
    Deleted(bool),
    #[serde(rename_all = "camelCase")]
    SampleLoaded { entries: usize, relationships: usize },
}

pub struct VaultService<I> {
    store: SharedStore,
    identity: Arc<Mutex<I>>,
}

impl<I> Clone for VaultService<I> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), identity: self.identity.clone() }
    }
}

impl<I: IdentityProvider> VaultService<I> {
    pub fn new(store: SharedStore, identity: Arc<Mutex<I>>) -> Self {
        Self { store, identity }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn identity(&self) -> &Arc<Mutex<I>> {
        &self.identity
    }

    fn identity_guard(&self) -> Result<MutexGuard<'_, I>> {
        Ok(self.identity.lock()?)
    }

    /// Resolve the caller; a missing token is `Unauthenticated`.
    pub fn owner(&self, token: Option<&str>) -> Result<OwnerId> {
        let token = token.ok_or_else(VaultError::unauthenticated)?;
        self.identity_guard()?.resolve(token)
    }

    pub fn execute(&self, token: Option<&str>, op: ApiOp) -> Result<ApiReply> {
        match op {
            ApiOp::Signup { email, password, name } => {
                Ok(ApiReply::Auth(self.identity_guard()?.signup(&email, &password, name.as_deref())?))
            }
            ApiOp::Login { email, password } => Ok(ApiReply::Auth(self.identity_guard()?.login(&email, &password)?)),
            ApiOp::Me => {
                let token = token.ok_or_else(VaultError::unauthenticated)?;
                Ok(ApiReply::User(self.identity_guard()?.me(token)?))
            }
            op => {
                let owner = self.owner(token)?;
                let mut store = lock_store(&self.store)?;
                Self::run_owned(&mut store, owner, op)
            }
        }
    }

    fn run_owned(store: &mut GraphStore, owner: OwnerId, op: ApiOp) -> Result<ApiReply> {
        let reply = match op {
            ApiOp::Entries { search, tag_names, entry_type } => {
                let filter = EntryFilter { search, types: entry_type.into_iter().collect(), tag_names };
                ApiReply::Entries(store.list_entry_views(owner, &filter))
            }
            ApiOp::Entry { id } => match store.entry_view(owner, id) {
                Ok(view) => ApiReply::Entry(Some(view)),
                Err(VaultError::NotFound { .. }) => ApiReply::Entry(None),
                Err(e) => return Err(e),
            },
            ApiOp::Tags => ApiReply::Tags(store.tags()),
            ApiOp::Relationships => ApiReply::Relationships(store.relationships(owner)),
            ApiOp::Graph { filter } => ApiReply::Graph(QueryEngine::snapshot(store, owner, &filter)?),
            ApiOp::CreateEntry { input } => {
                let entry = store.create_entry(owner, input)?;
                ApiReply::Entry(Some(store.entry_view(owner, entry.id)?))
            }
            ApiOp::UpdateEntry { id, input } => {
                store.update_entry(owner, id, input)?;
                ApiReply::Entry(Some(store.entry_view(owner, id)?))
            }
            ApiOp::DeleteEntry { id } => {
                store.delete_entry(owner, id)?;
                ApiReply::Deleted(true)
            }
            ApiOp::CreateRelationship { input } => ApiReply::Relationship(store.create_relationship(owner, input)?),
            ApiOp::DeleteRelationship { id } => {
                store.delete_relationship(owner, id)?;
                ApiReply::Deleted(true)
            }
            ApiOp::CreateTag { name, color } => ApiReply::Tag(store.create_tag(&name, color)?),
            ApiOp::LoadSampleData => {
                let (entries, relationships) = load_sample_data(store, owner)?;
                ApiReply::SampleLoaded { entries: entries.len(), relationships: relationships.len() }
            }
            ApiOp::Signup { .. } | ApiOp::Login { .. } | ApiOp::Me => {
                return Err(VaultError::validation("identity operations are not owner-scoped"));
            }
        };
        Ok(reply)
    }

    /// Parse a JSON request body; malformed bodies and unknown enum values are `Validation`.
    pub fn parse_op(body: &str) -> Result<ApiOp> {
        serde_json::from_str(body).map_err(|e| VaultError::validation(e.to_string()))
    }
}
