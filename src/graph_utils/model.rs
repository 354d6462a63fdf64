use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::VaultError;

// Basic type aliases for clarity
pub type EntryId = Uuid;
pub type TagId = Uuid;
pub type RelationshipId = Uuid;
pub type OwnerId = Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    Article,
    CodeSnippet,
    Bookmark,
}

impl EntryType {
    pub const ALL: [EntryType; 3] = [EntryType::Article, EntryType::CodeSnippet, EntryType::Bookmark];

    pub fn as_str(self) -> &'static str {
        match self {
            EntryType::Article => "ARTICLE",
            EntryType::CodeSnippet => "CODE_SNIPPET",
            EntryType::Bookmark => "BOOKMARK",
        }
    }

    /// "CODE_SNIPPET" -> "code snippet"
    pub fn human_label(self) -> String {
        self.as_str().replace('_', " ").to_lowercase()
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntryType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| VaultError::validation(format!("unknown entry type '{}'", s)))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    RelatedTo,
    SourceFor,
    InspiredBy,
    References,
    Contradicts,
    BuildsOn,
}

impl RelationshipType {
    pub const ALL: [RelationshipType; 6] = [
        RelationshipType::RelatedTo,
        RelationshipType::SourceFor,
        RelationshipType::InspiredBy,
        RelationshipType::References,
        RelationshipType::Contradicts,
        RelationshipType::BuildsOn,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RelationshipType::RelatedTo => "RELATED_TO",
            RelationshipType::SourceFor => "SOURCE_FOR",
            RelationshipType::InspiredBy => "INSPIRED_BY",
            RelationshipType::References => "REFERENCES",
            RelationshipType::Contradicts => "CONTRADICTS",
            RelationshipType::BuildsOn => "BUILDS_ON",
        }
    }

    pub fn human_label(self) -> String {
        self.as_str().replace('_', " ").to_lowercase()
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipType {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RelationshipType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| VaultError::validation(format!("unknown relationship type '{}'", s)))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: EntryId,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub language: Option<String>,
    pub url: Option<String>,
    pub metadata: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub owner_id: OwnerId,
}

/// Shared vocabulary entry. Tags are global; their attachment to entries is owner-scoped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub color: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryTag {
    pub entry_id: EntryId,
    pub tag_id: TagId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: RelationshipId,
    #[serde(rename = "type")]
    pub rel_type: RelationshipType,
    pub description: Option<String>,
    pub from_entry_id: EntryId,
    pub to_entry_id: EntryId,
    pub owner_id: OwnerId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryInput {
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub metadata: Option<String>,
    #[serde(default)]
    pub tag_names: Option<Vec<String>>,
}

impl CreateEntryInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>, entry_type: EntryType) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            entry_type,
            language: None,
            url: None,
            metadata: None,
            tag_names: None,
        }
    }

    pub fn with_tags<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Partial update. `tag_names: Some(..)` replaces the whole tag set; `None` leaves it alone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntryInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, rename = "type")]
    pub entry_type: Option<EntryType>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub metadata: Option<String>,
    #[serde(default)]
    pub tag_names: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRelationshipInput {
    pub from_entry_id: EntryId,
    pub to_entry_id: EntryId,
    #[serde(rename = "type")]
    pub rel_type: RelationshipType,
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateRelationshipInput {
    pub fn new(from: EntryId, to: EntryId, rel_type: RelationshipType) -> Self {
        Self { from_entry_id: from, to_entry_id: to, rel_type, description: None }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Entry filter. All constraints AND-combine; an empty constraint imposes nothing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub types: Vec<EntryType>,
    #[serde(default)]
    pub tag_names: Vec<String>,
}

impl EntryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn of_type(mut self, entry_type: EntryType) -> Self {
        if !self.types.contains(&entry_type) {
            self.types.push(entry_type);
        }
        self
    }

    pub fn tagged<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag_names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Lower-cased, trimmed search needle; `None` when the search imposes nothing.
    pub fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, entry: &Entry, tag_names: &[&str]) -> bool {
        if let Some(needle) = self.needle()
            && !entry.title.to_lowercase().contains(&needle)
            && !entry.content.to_lowercase().contains(&needle)
        {
            return false;
        }
        if !self.types.is_empty() && !self.types.contains(&entry.entry_type) {
            return false;
        }
        if !self.tag_names.is_empty() {
            let wanted: HashSet<&str> = self.tag_names.iter().map(String::as_str).collect();
            if !tag_names.iter().any(|n| wanted.contains(n)) {
                return false;
            }
        }
        true
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySummary {
    pub id: EntryId,
    pub title: String,
}

/// One relationship as seen from one of its endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationRef {
    pub id: RelationshipId,
    #[serde(rename = "type")]
    pub rel_type: RelationshipType,
    pub description: Option<String>,
    /// The entry at the other end.
    pub entry: EntrySummary,
}

/// Read model of an entry with its tags and both relationship directions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryView {
    #[serde(flatten)]
    pub entry: Entry,
    pub tags: Vec<Tag>,
    pub from_relations: Vec<RelationRef>,
    pub to_relations: Vec<RelationRef>,
}

impl EntryView {
    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.name.as_str()).collect()
    }
}
