//! Launcher configuration, read once at startup from `config.json`.
//!
//! Every field has a default so a missing or partial file still yields a
//! usable configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.json";
const APP_DIR_NAME: &str = "fusion-launcher";

/// Azure application registered for the Minecraft sign-in flow
const DEFAULT_MICROSOFT_CLIENT_ID: &str = "c36a9fb6-4f2a-41ff-90bd-ae7cc92031eb";

/// Discord application the presence is published under
pub const DEFAULT_DISCORD_APP_ID: i64 = 1270436944387641416;

const DEFAULT_VERSION_MANIFEST_URL: &str =
    "https://launchermeta.mojang.com/mc/game/version_manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct LauncherConfig {
    /// Where settings, the stored credential and logs live
    pub data_dir: PathBuf,
    /// Game root used when a launch request has no install directory
    pub game_dir: PathBuf,
    pub default_version: String,
    pub version_manifest_url: String,
    pub microsoft_client_id: String,
    pub discord_app_id: i64,
    /// Label shown as presence details
    pub app_label: String,
    /// Address the UI boundary listens on; port 0 picks a free port
    pub control_bind: String,
    /// Browser origins the front end is served from. Requests carrying any
    /// other `Origin` are refused.
    pub control_allowed_origins: Vec<String>,
    /// Executables that must resolve before the shell starts
    pub required_dependencies: Vec<String>,
    pub java_path: Option<PathBuf>,
    /// Filter directives used when `RUST_LOG` is unset
    pub log_filter: String,
    pub log_retention_days: u64,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            game_dir: default_game_dir(),
            default_version: "1.20.1".to_string(),
            version_manifest_url: DEFAULT_VERSION_MANIFEST_URL.to_string(),
            microsoft_client_id: DEFAULT_MICROSOFT_CLIENT_ID.to_string(),
            discord_app_id: DEFAULT_DISCORD_APP_ID,
            app_label: "Fusion Launcher".to_string(),
            control_bind: "127.0.0.1:0".to_string(),
            control_allowed_origins: Vec::new(),
            required_dependencies: vec!["java".to_string()],
            java_path: None,
            log_filter: "info,hyper=warn,reqwest=warn".to_string(),
            log_retention_days: 7,
        }
    }
}

impl LauncherConfig {
    /// Load `config.json` from the default data directory
    pub fn load_default() -> Result<Self, String> {
        Self::load_from(&default_data_dir().join(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents =
            fs::read_to_string(path).map_err(|e| format!("Failed to read config file: {}", e))?;

        serde_json::from_str(&contents).map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// The executables to check at startup. A configured Java path replaces
    /// the bare `java` lookup.
    pub fn dependency_targets(&self) -> Vec<String> {
        self.required_dependencies
            .iter()
            .map(|dep| match (&self.java_path, dep.as_str()) {
                (Some(path), "java") => path.to_string_lossy().to_string(),
                _ => dep.clone(),
            })
            .collect()
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

#[cfg(target_os = "windows")]
fn default_game_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".minecraft")
}

#[cfg(target_os = "macos")]
fn default_game_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("minecraft")
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn default_game_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".minecraft")
}
