use egui::Color32;

use crate::graph_utils::model::{EntryType, RelationshipType};

pub const FALLBACK_COLOR: Color32 = Color32::from_rgb(0x64, 0x74, 0x8b);
pub const SEARCH_RING_COLOR: Color32 = Color32::from_rgb(0xfb, 0xbf, 0x24);
pub const NODE_STROKE_COLOR: Color32 = Color32::WHITE;

pub const NODE_STROKE_WIDTH: f32 = 2.0;
pub const EMPHASIS_STROKE_WIDTH: f32 = 3.0;
pub const EDGE_WIDTH: f32 = 2.0;
pub const HOVERED_EDGE_WIDTH: f32 = 4.0;
pub const EDGE_STROKE_OPACITY: f32 = 0.6;
/// Dash and gap length for dashed edges.
pub const DASH: f32 = 5.0;
/// Labels sit this far above the node centre.
pub const LABEL_OFFSET_Y: f32 = -30.0;
pub const LABEL_FONT_SIZE: f32 = 12.0;
pub const LABEL_MAX_CHARS: usize = 20;
pub const LABEL_KEEP_CHARS: usize = 17;
pub const HOVER_CARD_CONTENT_CHARS: usize = 100;

pub fn entry_color(t: EntryType) -> Color32 {
    match t {
        EntryType::Article => Color32::from_rgb(0x3b, 0x82, 0xf6),
        EntryType::CodeSnippet => Color32::from_rgb(0x10, 0xb9, 0x81),
        EntryType::Bookmark => Color32::from_rgb(0xf5, 0x9e, 0x0b),
    }
}

pub fn relationship_color(t: RelationshipType) -> Color32 {
    match t {
        RelationshipType::RelatedTo => FALLBACK_COLOR,
        RelationshipType::SourceFor => Color32::from_rgb(0x3b, 0x82, 0xf6),
        RelationshipType::InspiredBy => Color32::from_rgb(0x8b, 0x5c, 0xf6),
        RelationshipType::References => Color32::from_rgb(0x06, 0xb6, 0xd4),
        RelationshipType::Contradicts => Color32::from_rgb(0xef, 0x44, 0x44),
        RelationshipType::BuildsOn => Color32::from_rgb(0x10, 0xb9, 0x81),
    }
}

pub fn is_dashed(t: RelationshipType) -> bool {
    t == RelationshipType::Contradicts
}

pub fn node_radius(title: &str) -> f32 {
    (title.chars().count() as f32 * 0.8).clamp(15.0, 25.0)
}

pub fn hovered_node_radius(title: &str) -> f32 {
    (title.chars().count() as f32).clamp(20.0, 30.0)
}

/// Titles longer than 20 characters are cut to 17 plus an ellipsis.
pub fn truncate_label(title: &str) -> String {
    truncate_chars(title, LABEL_MAX_CHARS, LABEL_KEEP_CHARS)
}

/// Hover-card preview of entry content.
pub fn content_preview(content: &str) -> String {
    truncate_chars(content, HOVER_CARD_CONTENT_CHARS, HOVER_CARD_CONTENT_CHARS)
}

fn truncate_chars(s: &str, max: usize, keep: usize) -> String {
    if s.chars().count() > max {
        let mut out: String = s.chars().take(keep).collect();
        out.push_str("...");
        out
    } else {
        s.to_string()
    }
}

/// Parse `#rrggbb` or `#rgb`. Tag colours are free text, so anything else yields `None`.
pub fn parse_hex_color(s: &str) -> Option<Color32> {
    let hex = s.trim().strip_prefix('#')?;
    let channel = |i: usize, len: usize| u8::from_str_radix(hex.get(i..i + len)?, 16).ok();
    match hex.len() {
        6 => Some(Color32::from_rgb(channel(0, 2)?, channel(2, 2)?, channel(4, 2)?)),
        3 => {
            let (r, g, b) = (channel(0, 1)?, channel(1, 1)?, channel(2, 1)?);
            Some(Color32::from_rgb(r * 17, g * 17, b * 17))
        }
        _ => None,
    }
}

pub fn with_opacity(color: Color32, opacity: f32) -> Color32 {
    color.gamma_multiply(opacity.clamp(0.0, 1.0))
}

#[derive(Clone, Debug, PartialEq)]
pub struct LegendItem {
    pub label: String,
    pub color: Color32,
    pub dashed: bool,
}

pub fn node_legend() -> Vec<LegendItem> {
    EntryType::ALL
        .iter()
        .map(|t| LegendItem { label: t.human_label(), color: entry_color(*t), dashed: false })
        .collect()
}

pub fn edge_legend() -> Vec<LegendItem> {
    RelationshipType::ALL
        .iter()
        .map(|t| LegendItem { label: t.human_label(), color: relationship_color(*t), dashed: is_dashed(*t) })
        .collect()
}
