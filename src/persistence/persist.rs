use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::api::identity::LocalIdentity;
use crate::graph_utils::graph::GraphStore;
use crate::graph_utils::model::EntryId;
use crate::interaction::ViewTransform;
use super::settings::AppSettings;

/// Everything written to `state.ron`. Store indices and login sessions are rebuilt, not saved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultStateFile {
    pub store: GraphStore,
    #[serde(default)]
    pub identity: LocalIdentity,
    #[serde(default)]
    pub last_email: Option<String>,
    // store positions as map entries of entry id -> (x, y)
    #[serde(default)]
    pub node_positions: Vec<(EntryId, f32, f32)>,
    #[serde(default)]
    pub view: ViewTransform,
}

impl VaultStateFile {
    pub fn from_runtime(
        store: &GraphStore,
        identity: &LocalIdentity,
        last_email: Option<&str>,
        node_positions: &HashMap<EntryId, egui::Pos2>,
        view: ViewTransform,
    ) -> Self {
        let mut node_positions: Vec<(EntryId, f32, f32)> =
            node_positions.iter().map(|(id, pos)| (*id, pos.x, pos.y)).collect();
        node_positions.sort_by_key(|(id, _, _)| *id);
        Self {
            store: store.clone(),
            identity: identity.clone(),
            last_email: last_email.map(str::to_string),
            node_positions,
            view,
        }
    }

    pub fn positions(&self) -> HashMap<EntryId, egui::Pos2> {
        self.node_positions.iter().map(|(id, x, y)| (*id, egui::pos2(*x, *y))).collect()
    }
}

static SETTINGS_OVERRIDE: OnceLock<AppSettings> = OnceLock::new();
static STATE_PATH_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

pub fn set_settings_override(settings: AppSettings) {
    let _ = SETTINGS_OVERRIDE.set(settings);
}

/// Use `path` as the active state file instead of `<autosave dir>/state.ron`.
pub fn set_state_path_override(path: PathBuf) {
    let _ = STATE_PATH_OVERRIDE.set(path);
}

fn autosave_dir() -> PathBuf {
    if let Some(path) = STATE_PATH_OVERRIDE.get()
        && let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        return parent.to_path_buf();
    }
    // If an override is set (e.g. from main.rs), use it.
    if let Some(settings) = SETTINGS_OVERRIDE.get() {
        return settings.autosave_dir();
    }
    // Load settings if present; else use defaults
    let settings = AppSettings::load().unwrap_or_default();
    settings.autosave_dir()
}

pub fn active_state_path() -> PathBuf {
    if let Some(path) = STATE_PATH_OVERRIDE.get() {
        return path.clone();
    }
    autosave_dir().join("state.ron")
}

fn versioned_name_now() -> String {
    let now = OffsetDateTime::now_utc();
    let fmt = format_description!("[year][month][day]_[hour][minute][second]");
    let stamp = now.format(fmt).unwrap_or_else(|_| "unknown".to_string());
    format!("state_{}.ron", stamp)
}

pub fn versioned_state_path_now() -> PathBuf {
    autosave_dir().join(versioned_name_now())
}

fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("ron.tmp");
    {
        let mut f = File::create(&tmp_path)?;
        f.write_all(data)?;
        f.flush()?;
    }
    fs::rename(tmp_path, path)?;
    Ok(())
}

fn to_ron(state: &VaultStateFile) -> anyhow::Result<String> {
    let pretty = PrettyConfig::new()
        .separate_tuple_members(true)
        .enumerate_arrays(true);
    Ok(ron::ser::to_string_pretty(state, pretty)?)
}

pub fn save_to_path(state: &VaultStateFile, path: &Path) -> anyhow::Result<()> {
    let s = to_ron(state)?;
    atomic_write(path, s.as_bytes())?;
    log::info!(
        "saved {} entries, {} relationships to {}",
        state.store.entry_count(),
        state.store.relationship_count(),
        path.display()
    );
    Ok(())
}

pub fn save_active(state: &VaultStateFile) -> anyhow::Result<PathBuf> {
    let path = active_state_path();
    save_to_path(state, &path)?;
    Ok(path)
}

pub fn save_versioned(state: &VaultStateFile) -> anyhow::Result<PathBuf> {
    save_versioned_in(state, &autosave_dir())
}

pub fn save_versioned_in(state: &VaultStateFile, dir: &Path) -> anyhow::Result<PathBuf> {
    let path = dir.join(versioned_name_now());
    save_to_path(state, &path)?;
    Ok(path)
}

pub fn load_active() -> anyhow::Result<Option<VaultStateFile>> {
    let path = active_state_path();
    if !path.exists() {
        return Ok(None);
    }
    load_from_path(&path).map(Some)
}

pub fn load_from_path(path: &Path) -> anyhow::Result<VaultStateFile> {
    let mut f = File::open(path)?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let mut state: VaultStateFile = ron::from_str(&buf)?;
    state.view = state.view.sanitized();
    log::info!("loaded {} entries from {}", state.store.entry_count(), path.display());
    Ok(state)
}

pub fn list_versions() -> anyhow::Result<Vec<PathBuf>> {
    list_versions_in(&autosave_dir())
}

/// Versioned snapshots in `dir`, newest first.
pub fn list_versions_in(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = Vec::new();
    if dir.exists() {
        for e in fs::read_dir(dir)? {
            let p = e?.path();
            if let Some(name) = p.file_name().and_then(|s| s.to_str())
                && name.starts_with("state_") && name.ends_with(".ron")
            {
                entries.push(p);
            }
        }
    }
    // sort descending by filename (timestamp)
    entries.sort();
    entries.reverse();
    Ok(entries)
}
