//! Starter content for an empty vault.

use super::error::Result;
use super::graph::GraphStore;
use super::model::{
    CreateEntryInput, CreateRelationshipInput, EntryId, EntryType, OwnerId, RelationshipId,
    RelationshipType,
};

struct SampleEntry {
    title: &'static str,
    content: &'static str,
    entry_type: EntryType,
    language: Option<&'static str>,
    url: Option<&'static str>,
    tags: &'static [&'static str],
}

const SAMPLE_ENTRIES: [SampleEntry; 6] = [
    SampleEntry {
        title: "React Hooks Fundamentals",
        content: "Understanding useState, useEffect, and custom hooks. The foundation of modern React development with functional components.",
        entry_type: EntryType::Article,
        language: None,
        url: None,
        tags: &["React", "JavaScript", "Frontend"],
    },
    SampleEntry {
        title: "Custom Hook for API Calls",
        content: "function useApi(url) {\n  const [data, setData] = useState(null);\n  const [loading, setLoading] = useState(true);\n  useEffect(() => {\n    fetch(url).then(res => res.json()).then(setData).finally(() => setLoading(false));\n  }, [url]);\n  return { data, loading };\n}",
        entry_type: EntryType::CodeSnippet,
        language: Some("javascript"),
        url: None,
        tags: &["React", "JavaScript", "API", "Custom Hooks"],
    },
    SampleEntry {
        title: "TypeScript Best Practices",
        content: "Advanced TypeScript patterns, generics, utility types, and leaning on the type system for better code quality.",
        entry_type: EntryType::Article,
        language: None,
        url: None,
        tags: &["TypeScript", "Best Practices", "Development"],
    },
    SampleEntry {
        title: "D3.js Force Simulation",
        content: "Interactive data visualization with force simulations: physics-based layouts for network graphs and node-link diagrams.",
        entry_type: EntryType::Article,
        language: None,
        url: None,
        tags: &["D3.js", "Data Visualization", "JavaScript", "Interactive"],
    },
    SampleEntry {
        title: "Graph Visualization Component",
        content: "const simulation = d3.forceSimulation(nodes)\n  .force('link', d3.forceLink(links).id(d => d.id))\n  .force('charge', d3.forceManyBody().strength(-300))\n  .force('center', d3.forceCenter(width / 2, height / 2));",
        entry_type: EntryType::CodeSnippet,
        language: Some("typescript"),
        url: None,
        tags: &["D3.js", "React", "TypeScript", "Graph", "Visualization"],
    },
    SampleEntry {
        title: "Next.js Documentation",
        content: "Official Next.js documentation with guides, API reference, and examples for building full-stack React applications.",
        entry_type: EntryType::Bookmark,
        language: None,
        url: Some("https://nextjs.org/docs"),
        tags: &["Next.js", "React", "Documentation", "Full-Stack"],
    },
];

// (from index, to index, type, description)
const SAMPLE_RELATIONSHIPS: [(usize, usize, RelationshipType, &str); 6] = [
    (0, 1, RelationshipType::SourceFor, "Custom hook builds upon React Hooks fundamentals"),
    (0, 2, RelationshipType::RelatedTo, "Both are about modern development practices"),
    (3, 4, RelationshipType::SourceFor, "D3 concepts applied in graph component"),
    (4, 1, RelationshipType::InspiredBy, "Graph component inspired by custom hook patterns"),
    (5, 0, RelationshipType::References, "Next.js docs reference React fundamentals"),
    (2, 4, RelationshipType::BuildsOn, "TypeScript enhances graph component development"),
];

/// Creates the sample entries and their relationships for `owner`.
pub fn load_sample_data(store: &mut GraphStore, owner: OwnerId) -> Result<(Vec<EntryId>, Vec<RelationshipId>)> {
    let mut entry_ids = Vec::with_capacity(SAMPLE_ENTRIES.len());
    for sample in &SAMPLE_ENTRIES {
        let mut input = CreateEntryInput::new(sample.title, sample.content, sample.entry_type)
            .with_tags(sample.tags.iter().copied());
        if let Some(lang) = sample.language {
            input = input.with_language(lang);
        }
        if let Some(url) = sample.url {
            input = input.with_url(url);
        }
        entry_ids.push(store.create_entry(owner, input)?.id);
    }

    let mut rel_ids = Vec::with_capacity(SAMPLE_RELATIONSHIPS.len());
    for (from, to, rel_type, description) in SAMPLE_RELATIONSHIPS {
        let input = CreateRelationshipInput::new(entry_ids[from], entry_ids[to], rel_type).described(description);
        rel_ids.push(store.create_relationship(owner, input)?.id);
    }
    log::info!("loaded {} sample entries for owner {}", entry_ids.len(), owner);
    Ok((entry_ids, rel_ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_utils::model::EntryFilter;
    use uuid::Uuid;

    #[test]
    fn sample_data_is_connected_and_tagged() {
        let mut store = GraphStore::new();
        let owner = Uuid::now_v7();
        let (entries, rels) = load_sample_data(&mut store, owner).unwrap();
        assert_eq!(entries.len(), 6);
        assert_eq!(rels.len(), 6);
        let react = store.list_entries(owner, &EntryFilter::all().tagged(["React"]));
        assert_eq!(react.len(), 4);
        assert!(store.tags().iter().any(|t| t.name == "D3.js"));
    }
}
