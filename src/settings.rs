use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SETTINGS_FILE: &str = "settings.json";

pub const DISCORD_RPC: &str = "discord-rpc";
pub const AUTO_UPDATE: &str = "auto-update";
pub const DEFAULT_MEMORY: &str = "default-memory";

/// Plain string key/value pairs, stored as-is
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppSettings(BTreeMap<String, String>);

impl AppSettings {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Unset flags default to on, matching the UI's initial checkbox state
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).map(|v| v == "true").unwrap_or(true)
    }

    pub fn discord_rpc_enabled(&self) -> bool {
        self.flag(DISCORD_RPC)
    }

    pub fn auto_update_enabled(&self) -> bool {
        self.flag(AUTO_UPDATE)
    }

    pub fn default_memory(&self) -> Option<&str> {
        self.get(DEFAULT_MEMORY).filter(|v| !v.trim().is_empty())
    }
}

pub fn settings_path(data_dir: &Path) -> Result<PathBuf, String> {
    fs::create_dir_all(data_dir)
        .map_err(|e| format!("Failed to create app data directory: {}", e))?;

    Ok(data_dir.join(SETTINGS_FILE))
}

pub fn load_settings(path: &Path) -> Result<AppSettings, String> {
    tracing::debug!("Loading settings");

    if !path.exists() {
        return Ok(AppSettings::default());
    }

    let contents =
        fs::read_to_string(path).map_err(|e| format!("Failed to read settings file: {}", e))?;

    serde_json::from_str(&contents).map_err(|e| format!("Failed to parse settings: {}", e))
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<(), String> {
    tracing::debug!("Saving settings");

    let contents = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;

    fs::write(path, contents).map_err(|e| format!("Failed to write settings file: {}", e))
}

/// File-backed settings with an in-memory copy
pub struct SettingsStore {
    path: PathBuf,
    current: Mutex<AppSettings>,
}

impl SettingsStore {
    pub fn open(data_dir: &Path) -> Result<Self, String> {
        let path = settings_path(data_dir)?;
        let current = match load_settings(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("{}; starting with default settings", e);
                AppSettings::default()
            }
        };

        Ok(Self {
            path,
            current: Mutex::new(current),
        })
    }

    pub fn snapshot(&self) -> AppSettings {
        self.current.lock().unwrap().clone()
    }

    pub fn set(&self, key: &str, value: &str) -> Result<AppSettings, String> {
        let mut current = self.current.lock().unwrap();
        let mut updated = current.clone();
        updated.set(key, value);
        save_settings(&self.path, &updated)?;
        *current = updated.clone();
        Ok(updated)
    }
}
