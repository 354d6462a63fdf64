use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::graph_utils::graph::StorePolicy;

const APP_DIR: &str = "Knowledge-Vault";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    // If None, use OS default autosave directory
    #[serde(default)]
    pub autosave_override: Option<PathBuf>,
    // If None, use OS temporary directory for exports
    #[serde(default)]
    pub export_override: Option<PathBuf>,
    // If None, server traffic logs go to OS temp dir
    #[serde(default)]
    pub api_log_override: Option<PathBuf>,
    // API service configuration (actix)
    #[serde(default)]
    pub api_enabled: bool,
    #[serde(default = "AppSettings::default_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "AppSettings::default_port")]
    pub api_port: u16,
    /// Reject relationships whose endpoints belong to another owner.
    #[serde(default = "AppSettings::default_true")]
    pub enforce_endpoint_ownership: bool,
    #[serde(default = "AppSettings::default_seed")]
    pub layout_seed: u64,
    /// Canvas size used when the drawing area cannot be measured.
    #[serde(default = "AppSettings::default_canvas")]
    pub default_canvas: (f32, f32),
    #[serde(default = "AppSettings::default_debounce_ms")]
    pub search_debounce_ms: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            autosave_override: None,
            export_override: None,
            api_log_override: None,
            api_enabled: false,
            api_bind_addr: Self::default_bind_addr(),
            api_port: Self::default_port(),
            enforce_endpoint_ownership: true,
            layout_seed: Self::default_seed(),
            default_canvas: Self::default_canvas(),
            search_debounce_ms: Self::default_debounce_ms(),
        }
    }
}

impl AppSettings {
    fn config_dir() -> PathBuf {
        // Cross-platform user config dir
        #[cfg(target_os = "macos")]
        {
            // ~/Library/Application Support/Knowledge-Vault
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join("Library").join("Application Support").join(APP_DIR);
        }
        #[cfg(target_os = "windows")]
        {
            // %APPDATA%\Knowledge-Vault
            if let Ok(appdata) = std::env::var("APPDATA") {
                return PathBuf::from(appdata).join(APP_DIR);
            }
            return PathBuf::from(APP_DIR);
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_CONFIG_HOME/Knowledge-Vault or ~/.config/Knowledge-Vault
            if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg).join(APP_DIR);
            }
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join(".config").join(APP_DIR);
        }
    }

    fn autosave_default_dir() -> PathBuf {
        #[cfg(target_os = "macos")]
        {
            let tmp = std::env::var_os("TMPDIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("/tmp"));
            return tmp.join(APP_DIR);
        }
        #[cfg(target_os = "windows")]
        {
            // %LOCALAPPDATA%\Knowledge-Vault\Autosave else TEMP
            if let Ok(local) = std::env::var("LOCALAPPDATA") {
                return PathBuf::from(local).join(APP_DIR).join("Autosave");
            }
            if let Ok(temp) = std::env::var("TEMP") {
                return PathBuf::from(temp).join(APP_DIR);
            }
            return PathBuf::from(APP_DIR);
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_STATE_HOME/knowledge-vault or ~/.local/state/knowledge-vault, else /tmp/Knowledge-Vault
            if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
                return PathBuf::from(xdg).join("knowledge-vault");
            }
            if let Ok(home) = std::env::var("HOME") {
                return PathBuf::from(home).join(".local").join("state").join("knowledge-vault");
            }
            return PathBuf::from("/tmp").join(APP_DIR);
        }
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_dir())
    }

    /// Read `settings.json` from `dir`; defaults when the file is absent.
    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let json_path = dir.join(SETTINGS_FILE);
        if !json_path.exists() {
            return Ok(Self::default());
        }
        let mut f = fs::File::open(json_path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        Ok(serde_json::from_str(&s)?)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_dir())
    }

    pub fn save_to(&self, dir: &Path) -> anyhow::Result<()> {
        fs::create_dir_all(dir)?;
        let s = serde_json::to_string_pretty(self)?;
        let mut f = fs::File::create(dir.join(SETTINGS_FILE))?;
        f.write_all(s.as_bytes())?;
        log::info!("settings saved to {}", dir.display());
        Ok(())
    }

    pub fn autosave_dir(&self) -> PathBuf {
        if let Some(p) = &self.autosave_override { return p.clone(); }
        Self::autosave_default_dir()
    }

    /// Return the directory where the settings file (settings.json) is stored.
    /// This is OS-specific and resolves to a per-user configuration directory.
    pub fn settings_dir() -> PathBuf {
        Self::config_dir()
    }

    /// Default export directory when no override is set: {temp_dir}/Knowledge-Vault/exports
    pub fn export_default_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(APP_DIR);
        p.push("exports");
        p
    }

    pub fn export_dir(&self) -> PathBuf {
        if let Some(p) = &self.export_override { return p.clone(); }
        Self::export_default_dir()
    }

    pub(crate) fn default_bind_addr() -> String { "127.0.0.1".to_string() }
    pub(crate) fn default_port() -> u16 { 8787 }
    fn default_true() -> bool { true }
    fn default_seed() -> u64 { 42 }
    fn default_canvas() -> (f32, f32) { (800.0, 600.0) }
    fn default_debounce_ms() -> u64 { 300 }

    pub fn api_endpoint(&self) -> String {
        format!("{}:{}", self.api_bind_addr, self.api_port)
    }

    /// Default API log directory when no override is set: {temp_dir}/Knowledge-Vault/api-logs
    pub fn api_log_default_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(APP_DIR);
        p.push("api-logs");
        p
    }

    pub fn api_log_dir(&self) -> PathBuf {
        if let Some(p) = &self.api_log_override { return p.clone(); }
        Self::api_log_default_dir()
    }

    pub fn store_policy(&self) -> StorePolicy {
        StorePolicy { enforce_endpoint_ownership: self.enforce_endpoint_ownership }
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn canvas_fallback(&self) -> egui::Vec2 {
        egui::vec2(self.default_canvas.0, self.default_canvas.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let s: AppSettings = serde_json::from_str(r#"{"api_port": 9000}"#).unwrap();
        assert_eq!(s.api_port, 9000);
        assert!(s.enforce_endpoint_ownership);
        assert_eq!(s.layout_seed, 42);
        assert_eq!(s.search_debounce(), Duration::from_millis(300));
        assert_eq!(s.api_endpoint(), "127.0.0.1:9000");
    }

    #[test]
    fn overrides_win() {
        let s = AppSettings { export_override: Some(PathBuf::from("/x/exports")), ..Default::default() };
        assert_eq!(s.export_dir(), PathBuf::from("/x/exports"));
        assert!(AppSettings::default().export_dir().ends_with("Knowledge-Vault/exports"));
    }
}
