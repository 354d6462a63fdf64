//! Knowledge Vault: typed entries, tags and relationships explored as a force-directed graph.

pub mod api;
pub mod graph_utils;
pub mod gui;
pub mod interaction;
pub mod layout;
pub mod persistence;
pub mod query;
pub mod render;
