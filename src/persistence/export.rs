//! Owner-scoped exports: pretty JSON, Markdown, and a pair of CSV files.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::graph_utils::graph::GraphStore;
use crate::graph_utils::model::{Entry, EntryFilter, EntrySummary, EntryView, OwnerId, RelationRef, RelationshipType, Tag};

pub const EXPORT_VERSION: &str = "1.0";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutgoingOut<'a> {
    id: &'a uuid::Uuid,
    #[serde(rename = "type")]
    rel_type: RelationshipType,
    description: &'a Option<String>,
    to_entry: &'a EntrySummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IncomingOut<'a> {
    id: &'a uuid::Uuid,
    #[serde(rename = "type")]
    rel_type: RelationshipType,
    description: &'a Option<String>,
    from_entry: &'a EntrySummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntryOut<'a> {
    #[serde(flatten)]
    entry: &'a Entry,
    tags: &'a [Tag],
    from_relations: Vec<OutgoingOut<'a>>,
    to_relations: Vec<IncomingOut<'a>>,
}

impl<'a> From<&'a EntryView> for EntryOut<'a> {
    fn from(view: &'a EntryView) -> Self {
        let outgoing = |r: &'a RelationRef| OutgoingOut {
            id: &r.id,
            rel_type: r.rel_type,
            description: &r.description,
            to_entry: &r.entry,
        };
        let incoming = |r: &'a RelationRef| IncomingOut {
            id: &r.id,
            rel_type: r.rel_type,
            description: &r.description,
            from_entry: &r.entry,
        };
        Self {
            entry: &view.entry,
            tags: &view.tags,
            from_relations: view.from_relations.iter().map(outgoing).collect(),
            to_relations: view.to_relations.iter().map(incoming).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportOut<'a> {
    version: &'static str,
    export_date: String,
    entries: Vec<EntryOut<'a>>,
}

fn owner_views(store: &GraphStore, owner: OwnerId) -> Vec<EntryView> {
    store.list_entry_views(owner, &EntryFilter::all())
}

/// `knowledge-vault-export-YYYY-MM-DD.<ext>` for the given moment.
pub fn export_file_name(at: OffsetDateTime, ext: &str) -> String {
    let fmt = format_description!("[year]-[month]-[day]");
    let day = at.format(fmt).unwrap_or_else(|_| "unknown".to_string());
    format!("knowledge-vault-export-{}.{}", day, ext)
}

pub fn default_export_path(dir: &Path, ext: &str) -> PathBuf {
    dir.join(export_file_name(OffsetDateTime::now_utc(), ext))
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn render_json(store: &GraphStore, owner: OwnerId, at: OffsetDateTime) -> anyhow::Result<String> {
    let views = owner_views(store, owner);
    let out = ExportOut {
        version: EXPORT_VERSION,
        export_date: at.format(&Rfc3339)?,
        entries: views.iter().map(EntryOut::from).collect(),
    };
    let mut s = serde_json::to_string_pretty(&out)?;
    s.push('\n');
    Ok(s)
}

pub fn export_json(store: &GraphStore, owner: OwnerId, path: &Path) -> anyhow::Result<()> {
    let body = render_json(store, owner, OffsetDateTime::now_utc())?;
    ensure_parent(path)?;
    let mut f = File::create(path)?;
    f.write_all(body.as_bytes())?;
    log::info!("exported JSON to {}", path.display());
    Ok(())
}

pub fn render_markdown(store: &GraphStore, owner: OwnerId, at: OffsetDateTime) -> String {
    let date_fmt = format_description!("[year]-[month]-[day]");
    let mut md = String::from("# Knowledge Vault Export\n\n");
    md.push_str(&format!("Export Date: {}\n\n", at.format(date_fmt).unwrap_or_default()));

    for view in owner_views(store, owner) {
        let entry = &view.entry;
        md.push_str(&format!("## {}\n\n", entry.title));
        md.push_str(&format!("**Type:** {}\n\n", entry.entry_type.as_str()));
        if !view.tags.is_empty() {
            md.push_str(&format!("**Tags:** {}\n\n", view.tag_names().join(", ")));
        }
        if let Some(url) = &entry.url {
            md.push_str(&format!("**URL:** {}\n\n", url));
        }
        if let Some(language) = &entry.language {
            md.push_str(&format!("**Language:** {}\n\n", language));
        }
        md.push_str(&format!("{}\n\n", entry.content));

        if !view.from_relations.is_empty() || !view.to_relations.is_empty() {
            md.push_str("**Relationships:**\n");
            for rel in &view.from_relations {
                md.push_str(&format!("- {}: → {}\n", rel.rel_type.as_str(), rel.entry.title));
            }
            for rel in &view.to_relations {
                md.push_str(&format!("- {}: ← {}\n", rel.rel_type.as_str(), rel.entry.title));
            }
            md.push('\n');
        }
        md.push_str("---\n\n");
    }
    md
}

pub fn export_markdown(store: &GraphStore, owner: OwnerId, path: &Path) -> anyhow::Result<()> {
    let md = render_markdown(store, owner, OffsetDateTime::now_utc());
    ensure_parent(path)?;
    std::fs::write(path, md)?;
    log::info!("exported Markdown to {}", path.display());
    Ok(())
}

/// Writes `{stem}_entries.csv` and `{stem}_relationships.csv` next to `base_path`.
pub fn export_csv(store: &GraphStore, owner: OwnerId, base_path: &Path) -> anyhow::Result<(PathBuf, PathBuf)> {
    let parent = base_path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let stem = base_path.file_stem().and_then(|s| s.to_str()).unwrap_or("knowledge-vault");
    let entries_path = parent.join(format!("{}_entries.csv", stem));
    let rels_path = parent.join(format!("{}_relationships.csv", stem));

    let views = owner_views(store, owner);
    {
        let mut wtr = csv::Writer::from_path(&entries_path)?;
        wtr.write_record(["id", "title", "type", "tags", "language", "url", "created_at", "content"])?;
        for view in &views {
            let e = &view.entry;
            let created = e.created_at.format(&Rfc3339).unwrap_or_default();
            wtr.write_record([
                e.id.to_string(),
                e.title.clone(),
                e.entry_type.as_str().to_string(),
                view.tag_names().join(";"),
                e.language.clone().unwrap_or_default(),
                e.url.clone().unwrap_or_default(),
                created,
                e.content.clone(),
            ])?;
        }
        wtr.flush()?;
    }
    {
        let mut wtr = csv::Writer::from_path(&rels_path)?;
        wtr.write_record(["id", "from", "to", "type", "description"])?;
        for r in store.relationships(owner) {
            wtr.write_record([
                r.id.to_string(),
                r.from_entry_id.to_string(),
                r.to_entry_id.to_string(),
                r.rel_type.as_str().to_string(),
                r.description.unwrap_or_default(),
            ])?;
        }
        wtr.flush()?;
    }
    log::info!("exported CSV to {} and {}", entries_path.display(), rels_path.display());
    Ok((entries_path, rels_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_utils::model::{CreateEntryInput, CreateRelationshipInput, EntryType};
    use time::macros::datetime;
    use uuid::Uuid;

    #[test]
    fn file_name_uses_the_export_day() {
        assert_eq!(
            export_file_name(datetime!(2024-03-05 23:10 UTC), "json"),
            "knowledge-vault-export-2024-03-05.json"
        );
    }

    #[test]
    fn markdown_lists_relationships_in_both_directions() {
        let owner = Uuid::new_v4();
        let mut store = GraphStore::new();
        let a = store
            .create_entry(owner, CreateEntryInput::new("Hooks", "useState", EntryType::CodeSnippet).with_language("ts"))
            .unwrap();
        let b = store.create_entry(owner, CreateEntryInput::new("React", "docs", EntryType::Article)).unwrap();
        store
            .create_relationship(owner, CreateRelationshipInput::new(a.id, b.id, RelationshipType::BuildsOn))
            .unwrap();

        let md = render_markdown(&store, owner, datetime!(2024-01-02 00:00 UTC));
        assert!(md.starts_with("# Knowledge Vault Export\n\nExport Date: 2024-01-02"));
        assert!(md.contains("**Language:** ts"));
        assert!(md.contains("- BUILDS_ON: → React"));
        assert!(md.contains("- BUILDS_ON: ← Hooks"));
        assert_eq!(md.matches("---\n\n").count(), 2);
    }

    #[test]
    fn json_nests_relation_endpoints() {
        let owner = Uuid::new_v4();
        let mut store = GraphStore::new();
        let a = store.create_entry(owner, CreateEntryInput::new("A", "a", EntryType::Bookmark)).unwrap();
        let b = store.create_entry(owner, CreateEntryInput::new("B", "b", EntryType::Bookmark)).unwrap();
        store
            .create_relationship(owner, CreateRelationshipInput::new(a.id, b.id, RelationshipType::References))
            .unwrap();
        let other = Uuid::new_v4();
        store.create_entry(other, CreateEntryInput::new("Hidden", "x", EntryType::Bookmark)).unwrap();

        let v: serde_json::Value =
            serde_json::from_str(&render_json(&store, owner, datetime!(2024-01-02 03:04:05 UTC)).unwrap()).unwrap();
        assert_eq!(v["version"], "1.0");
        assert_eq!(v["exportDate"], "2024-01-02T03:04:05Z");
        let entries = v["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        let a_out = entries.iter().find(|e| e["title"] == "A").unwrap();
        assert_eq!(a_out["fromRelations"][0]["toEntry"]["title"], "B");
        assert_eq!(a_out["fromRelations"][0]["type"], "REFERENCES");
    }
}
