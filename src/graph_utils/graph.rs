use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use super::error::{Result, VaultError};
use super::model::{
    CreateEntryInput, CreateRelationshipInput, Entry, EntryFilter, EntryId, EntrySummary, EntryTag,
    EntryView, OwnerId, RelationRef, Relationship, RelationshipId, Tag, TagId, UpdateEntryInput,
};

/// Store handle shared between the UI thread, the background query loader and the API server.
pub type SharedStore = Arc<Mutex<GraphStore>>;

pub fn shared(store: GraphStore) -> SharedStore {
    Arc::new(Mutex::new(store))
}

pub fn lock_store(store: &SharedStore) -> Result<MutexGuard<'_, GraphStore>> {
    Ok(store.lock()?)
}

/// Write-time policy knobs that are configuration, not data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StorePolicy {
    /// Reject relationships whose endpoints are not owned by the creating owner.
    pub enforce_endpoint_ownership: bool,
}

impl Default for StorePolicy {
    fn default() -> Self {
        Self { enforce_endpoint_ownership: true }
    }
}

/// Authoritative entry/tag/relationship records. Every read and write is scoped to an owner,
/// except the tag vocabulary which is shared.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "StoreRecords", into = "StoreRecords")]
pub struct GraphStore {
    entries: HashMap<EntryId, Entry>,
    tags: HashMap<TagId, Tag>,
    entry_tags: BTreeSet<EntryTag>,
    relationships: HashMap<RelationshipId, Relationship>,
    // Derived indices, rebuilt on load
    tag_by_name: HashMap<String, TagId>,
    outgoing: HashMap<EntryId, Vec<RelationshipId>>,
    incoming: HashMap<EntryId, Vec<RelationshipId>>,
    last_stamp: Option<OffsetDateTime>,
    policy: StorePolicy,
}

/// Persisted form of the store: plain record lists, no indices.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StoreRecords {
    pub entries: Vec<Entry>,
    pub tags: Vec<Tag>,
    pub entry_tags: Vec<EntryTag>,
    pub relationships: Vec<Relationship>,
}

impl From<StoreRecords> for GraphStore {
    fn from(records: StoreRecords) -> Self {
        let mut store = GraphStore::new();
        store.entries = records.entries.into_iter().map(|e| (e.id, e)).collect();
        store.tags = records.tags.into_iter().map(|t| (t.id, t)).collect();
        store.entry_tags = records.entry_tags.into_iter().collect();
        store.relationships = records.relationships.into_iter().map(|r| (r.id, r)).collect();
        store.rebuild_indices();
        store
    }
}

impl From<GraphStore> for StoreRecords {
    fn from(store: GraphStore) -> Self {
        let mut entries: Vec<Entry> = store.entries.into_values().collect();
        entries.sort_by_key(|e| e.id);
        let mut tags: Vec<Tag> = store.tags.into_values().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        let mut relationships: Vec<Relationship> = store.relationships.into_values().collect();
        relationships.sort_by_key(|r| r.id);
        StoreRecords {
            entries,
            tags,
            entry_tags: store.entry_tags.into_iter().collect(),
            relationships,
        }
    }
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn required_title(title: &str) -> Result<String> {
    let t = title.trim();
    if t.is_empty() {
        return Err(VaultError::validation("title must not be empty"));
    }
    Ok(t.to_string())
}

fn normalize_tag_names(names: &[String]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(names.len());
    for raw in names {
        let name = raw.trim();
        if name.is_empty() {
            return Err(VaultError::validation("tag names must not be empty"));
        }
        if seen.insert(name.to_string()) {
            out.push(name.to_string());
        }
    }
    Ok(out)
}

impl GraphStore {
    // Instantiate a new, empty store
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: StorePolicy) -> Self {
        Self { policy, ..Self::default() }
    }

    pub fn policy(&self) -> StorePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: StorePolicy) {
        self.policy = policy;
    }

    fn rebuild_indices(&mut self) {
        self.tag_by_name = self.tags.values().map(|t| (t.name.clone(), t.id)).collect();
        self.outgoing.clear();
        self.incoming.clear();
        let mut rels: Vec<&Relationship> = self.relationships.values().collect();
        rels.sort_by_key(|r| (r.created_at, r.id));
        for rel in rels {
            self.outgoing.entry(rel.from_entry_id).or_default().push(rel.id);
            self.incoming.entry(rel.to_entry_id).or_default().push(rel.id);
        }
        self.last_stamp = self.entries.values().map(|e| e.updated_at).max();
    }

    // Strictly increasing so that recency ordering never ties between two writes.
    fn stamp(&mut self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        let next = match self.last_stamp {
            Some(last) if now <= last => last + Duration::nanoseconds(1),
            _ => now,
        };
        self.last_stamp = Some(next);
        next
    }

    fn owned_entry(&self, owner: OwnerId, id: EntryId) -> Result<&Entry> {
        self.entries
            .get(&id)
            .filter(|e| e.owner_id == owner)
            .ok_or_else(|| VaultError::not_found("Entry", id))
    }

    fn find_or_create_tag(&mut self, name: &str, color: Option<String>) -> TagId {
        if let Some(id) = self.tag_by_name.get(name) {
            return *id;
        }
        let id = Uuid::now_v7();
        let tag = Tag { id, name: name.to_string(), color, created_at: self.stamp() };
        self.tag_by_name.insert(tag.name.clone(), id);
        self.tags.insert(id, tag);
        log::debug!("created tag '{}' ({})", name, id);
        id
    }

    // Delete-then-recreate the join rows for one entry.
    fn replace_entry_tags(&mut self, entry_id: EntryId, names: &[String]) {
        self.entry_tags.retain(|et| et.entry_id != entry_id);
        for name in names {
            let tag_id = self.find_or_create_tag(name, None);
            self.entry_tags.insert(EntryTag { entry_id, tag_id });
        }
    }

    /// Tags attached to an entry, sorted by name.
    pub fn tags_of(&self, entry_id: EntryId) -> Vec<&Tag> {
        let mut tags: Vec<&Tag> = self
            .entry_tags
            .range(EntryTag { entry_id, tag_id: Uuid::nil() }..=EntryTag { entry_id, tag_id: Uuid::from_u128(u128::MAX) })
            .filter_map(|et| self.tags.get(&et.tag_id))
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }

    pub fn tag_names_of(&self, entry_id: EntryId) -> Vec<&str> {
        self.tags_of(entry_id).into_iter().map(|t| t.name.as_str()).collect()
    }

    /// Filtered entries of one owner, most recently updated first.
    pub fn list_entries(&self, owner: OwnerId, filter: &EntryFilter) -> Vec<Entry> {
        let mut out: Vec<Entry> = self
            .entries
            .values()
            .filter(|e| e.owner_id == owner)
            .filter(|e| filter.matches(e, &self.tag_names_of(e.id)))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| b.id.cmp(&a.id)));
        out
    }

    pub fn list_entry_views(&self, owner: OwnerId, filter: &EntryFilter) -> Vec<EntryView> {
        self.list_entries(owner, filter)
            .into_iter()
            .map(|e| self.view_of(e))
            .collect()
    }

    pub fn entry(&self, owner: OwnerId, id: EntryId) -> Result<&Entry> {
        self.owned_entry(owner, id)
    }

    pub fn entry_view(&self, owner: OwnerId, id: EntryId) -> Result<EntryView> {
        let entry = self.owned_entry(owner, id)?.clone();
        Ok(self.view_of(entry))
    }

    fn summary(&self, id: EntryId) -> EntrySummary {
        let title = self.entries.get(&id).map(|e| e.title.clone()).unwrap_or_default();
        EntrySummary { id, title }
    }

    fn view_of(&self, entry: Entry) -> EntryView {
        let tags = self.tags_of(entry.id).into_iter().cloned().collect();
        let from_relations = self
            .relationships_from(entry.id)
            .into_iter()
            .map(|r| RelationRef {
                id: r.id,
                rel_type: r.rel_type,
                description: r.description.clone(),
                entry: self.summary(r.to_entry_id),
            })
            .collect();
        let to_relations = self
            .relationships_to(entry.id)
            .into_iter()
            .map(|r| RelationRef {
                id: r.id,
                rel_type: r.rel_type,
                description: r.description.clone(),
                entry: self.summary(r.from_entry_id),
            })
            .collect();
        EntryView { entry, tags, from_relations, to_relations }
    }

    pub fn create_entry(&mut self, owner: OwnerId, input: CreateEntryInput) -> Result<Entry> {
        let title = required_title(&input.title)?;
        let tag_names = normalize_tag_names(input.tag_names.as_deref().unwrap_or_default())?;
        let now = self.stamp();
        let entry = Entry {
            id: Uuid::now_v7(),
            title,
            content: input.content,
            entry_type: input.entry_type,
            language: clean_optional(input.language),
            url: clean_optional(input.url),
            metadata: clean_optional(input.metadata),
            created_at: now,
            updated_at: now,
            owner_id: owner,
        };
        self.entries.insert(entry.id, entry.clone());
        self.replace_entry_tags(entry.id, &tag_names);
        log::debug!("created entry {} for owner {}", entry.id, owner);
        Ok(entry)
    }

    pub fn update_entry(&mut self, owner: OwnerId, id: EntryId, input: UpdateEntryInput) -> Result<Entry> {
        self.owned_entry(owner, id)?;
        let title = input.title.as_deref().map(required_title).transpose()?;
        let tag_names = input.tag_names.as_deref().map(normalize_tag_names).transpose()?;
        let now = self.stamp();

        let entry = self
            .entries
            .get_mut(&id)
            .ok_or_else(|| VaultError::not_found("Entry", id))?;
        if let Some(t) = title { entry.title = t; }
        if let Some(c) = input.content { entry.content = c; }
        // Type changes leave language/url as they were.
        if let Some(ty) = input.entry_type { entry.entry_type = ty; }
        if input.language.is_some() { entry.language = clean_optional(input.language); }
        if input.url.is_some() { entry.url = clean_optional(input.url); }
        if input.metadata.is_some() { entry.metadata = clean_optional(input.metadata); }
        entry.updated_at = now;
        let updated = entry.clone();

        if let Some(names) = tag_names {
            self.replace_entry_tags(id, &names);
        }
        log::debug!("updated entry {}", id);
        Ok(updated)
    }

    /// Deletes the entry and every relationship touching it. Returns the number of
    /// relationships removed by the cascade.
    pub fn delete_entry(&mut self, owner: OwnerId, id: EntryId) -> Result<usize> {
        self.owned_entry(owner, id)?;
        self.entries.remove(&id);
        self.entry_tags.retain(|et| et.entry_id != id);

        // Cascade delete relationships involving this entry
        let mut to_remove: Vec<RelationshipId> = Vec::new();
        to_remove.extend(self.outgoing.get(&id).into_iter().flatten().copied());
        to_remove.extend(self.incoming.get(&id).into_iter().flatten().copied());
        to_remove.sort();
        to_remove.dedup();
        for rid in &to_remove {
            self.remove_relationship_record(*rid);
        }
        self.outgoing.remove(&id);
        self.incoming.remove(&id);
        if !to_remove.is_empty() {
            log::info!("deleted entry {} and {} dependent relationship(s)", id, to_remove.len());
        } else {
            log::debug!("deleted entry {}", id);
        }
        Ok(to_remove.len())
    }

    fn remove_relationship_record(&mut self, id: RelationshipId) -> Option<Relationship> {
        let rel = self.relationships.remove(&id)?;
        if let Some(v) = self.outgoing.get_mut(&rel.from_entry_id) {
            v.retain(|r| *r != id);
        }
        if let Some(v) = self.incoming.get_mut(&rel.to_entry_id) {
            v.retain(|r| *r != id);
        }
        Some(rel)
    }

    pub fn create_relationship(&mut self, owner: OwnerId, input: CreateRelationshipInput) -> Result<Relationship> {
        for endpoint in [input.from_entry_id, input.to_entry_id] {
            let entry = self
                .entries
                .get(&endpoint)
                .ok_or_else(|| VaultError::not_found("Entry", endpoint))?;
            if self.policy.enforce_endpoint_ownership && entry.owner_id != owner {
                return Err(VaultError::not_found("Entry", endpoint));
            }
        }
        let rel = Relationship {
            id: Uuid::now_v7(),
            rel_type: input.rel_type,
            description: clean_optional(input.description),
            from_entry_id: input.from_entry_id,
            to_entry_id: input.to_entry_id,
            owner_id: owner,
            created_at: self.stamp(),
        };
        self.outgoing.entry(rel.from_entry_id).or_default().push(rel.id);
        self.incoming.entry(rel.to_entry_id).or_default().push(rel.id);
        self.relationships.insert(rel.id, rel.clone());
        log::debug!("created relationship {} {} -> {}", rel.rel_type, rel.from_entry_id, rel.to_entry_id);
        Ok(rel)
    }

    pub fn delete_relationship(&mut self, owner: OwnerId, id: RelationshipId) -> Result<()> {
        match self.relationships.get(&id) {
            Some(rel) if rel.owner_id == owner => {
                self.remove_relationship_record(id);
                log::debug!("deleted relationship {}", id);
                Ok(())
            }
            _ => Err(VaultError::not_found("Relationship", id)),
        }
    }

    /// All relationships created by the owner, oldest first.
    pub fn relationships(&self, owner: OwnerId) -> Vec<Relationship> {
        let mut out: Vec<Relationship> = self
            .relationships
            .values()
            .filter(|r| r.owner_id == owner)
            .cloned()
            .collect();
        out.sort_by_key(|r| (r.created_at, r.id));
        out
    }

    pub fn relationship(&self, owner: OwnerId, id: RelationshipId) -> Result<&Relationship> {
        self.relationships
            .get(&id)
            .filter(|r| r.owner_id == owner)
            .ok_or_else(|| VaultError::not_found("Relationship", id))
    }

    pub fn relationships_from(&self, entry_id: EntryId) -> Vec<&Relationship> {
        self.outgoing
            .get(&entry_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.relationships.get(id))
            .collect()
    }

    pub fn relationships_to(&self, entry_id: EntryId) -> Vec<&Relationship> {
        self.incoming
            .get(&entry_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.relationships.get(id))
            .collect()
    }

    /// The shared tag vocabulary, sorted by name.
    pub fn tags(&self) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }

    /// Find-or-create by exact name; an existing tag keeps its colour.
    pub fn create_tag(&mut self, name: &str, color: Option<String>) -> Result<Tag> {
        let name = name.trim();
        if name.is_empty() {
            return Err(VaultError::validation("tag name must not be empty"));
        }
        let id = self.find_or_create_tag(name, clean_optional(color));
        self.tags
            .get(&id)
            .cloned()
            .ok_or_else(|| VaultError::not_found("Tag", id))
    }

    pub fn entry_count(&self) -> usize { self.entries.len() }
    pub fn relationship_count(&self) -> usize { self.relationships.len() }
    pub fn tag_count(&self) -> usize { self.tags.len() }

    pub fn owner_entry_count(&self, owner: OwnerId) -> usize {
        self.entries.values().filter(|e| e.owner_id == owner).count()
    }
}
