//! Request/response messages between the front end and the launcher.
//!
//! Every command answers with a JSON object; failures are reported as
//! `{"success": false, "message": ...}` rather than transport errors.

use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::dialogs::{FileDialogs, FileFilter};
use super::window::ShellWindow;
use crate::auth::Credential;
use crate::launch::{Coordinator, NumberOrText, RawLaunchOptions, SessionState};
use crate::presence::PresenceHub;
use crate::settings::{SettingsStore, DISCORD_RPC};

#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum ShellRequest {
    WindowMinimize,
    WindowMaximize,
    WindowClose,
    LaunchMinecraft {
        #[serde(default)]
        options: RawLaunchOptions,
    },
    AuthenticateMicrosoft,
    GetMinecraftVersions,
    BrowseDirectory,
    BrowseFile {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        filters: Vec<FileFilter>,
    },
    LoadUserData,
    LogoutUser,
    GetSettings,
    SetSetting {
        key: String,
        value: Value,
    },
    GetSessionState,
}

fn failure(message: impl ToString) -> Value {
    json!({ "success": false, "message": message.to_string() })
}

fn signed_in(credential: &Credential) -> Value {
    json!({
        "success": true,
        "auth": credential.token,
        "username": credential.display_name,
        "uuid": credential.unique_id,
    })
}

/// Settings arrive as whatever the front end had at hand; store their text
fn setting_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub struct Shell {
    coordinator: Arc<Coordinator>,
    settings: Arc<SettingsStore>,
    presence: Arc<PresenceHub>,
    window: Arc<dyn ShellWindow>,
    dialogs: Arc<dyn FileDialogs>,
}

impl Shell {
    pub fn new(
        coordinator: Arc<Coordinator>,
        settings: Arc<SettingsStore>,
        presence: Arc<PresenceHub>,
        window: Arc<dyn ShellWindow>,
        dialogs: Arc<dyn FileDialogs>,
    ) -> Self {
        Self {
            coordinator,
            settings,
            presence,
            window,
            dialogs,
        }
    }

    pub async fn dispatch(&self, request: ShellRequest) -> Value {
        tracing::debug!("Shell request: {:?}", request);

        match request {
            ShellRequest::WindowMinimize => {
                self.window.minimize();
                Value::Null
            }
            ShellRequest::WindowMaximize => {
                self.window.maximize();
                Value::Null
            }
            ShellRequest::WindowClose => {
                self.window.close();
                Value::Null
            }
            ShellRequest::LaunchMinecraft { options } => self.launch(options).await,
            ShellRequest::AuthenticateMicrosoft => match self.coordinator.authenticate().await {
                Ok(credential) => signed_in(&credential),
                Err(e) => {
                    tracing::warn!("{}", e);
                    failure(e)
                }
            },
            ShellRequest::GetMinecraftVersions => {
                match self.coordinator.fetch_available_versions().await {
                    Ok(versions) => json!({ "success": true, "versions": versions }),
                    Err(e) => {
                        tracing::warn!("{}", e);
                        json!({ "success": false, "message": e.to_string(), "versions": [] })
                    }
                }
            }
            ShellRequest::BrowseDirectory => {
                let path = self.dialogs.pick_directory(None).await;
                json!({ "success": path.is_some(), "path": path })
            }
            ShellRequest::BrowseFile { title, filters } => {
                let path = self.dialogs.pick_file(title, filters).await;
                json!({ "success": path.is_some(), "path": path })
            }
            ShellRequest::LoadUserData => match self.coordinator.restore().await {
                Ok(Some(credential)) => signed_in(&credential),
                Ok(None) => failure("No saved sign-in"),
                Err(e) => failure(e),
            },
            ShellRequest::LogoutUser => {
                self.coordinator.logout();
                json!({ "success": true })
            }
            ShellRequest::GetSettings => {
                let settings = self.settings.snapshot();
                json!({
                    "success": true,
                    "flags": {
                        "discordRpc": settings.discord_rpc_enabled(),
                        "autoUpdate": settings.auto_update_enabled(),
                    },
                    "settings": settings,
                })
            }
            ShellRequest::SetSetting { key, value } => self.set_setting(&key, &value),
            ShellRequest::GetSessionState => {
                let state = self.coordinator.state();
                let exit_code = match state {
                    SessionState::Closed(code) => Some(code),
                    _ => None,
                };
                json!({
                    "success": true,
                    "state": state.to_string(),
                    "exitCode": exit_code,
                    "authenticated": self.coordinator.credential().is_some(),
                })
            }
        }
    }

    async fn launch(&self, mut options: RawLaunchOptions) -> Value {
        if options.memory.is_none() {
            options.memory = self
                .settings
                .snapshot()
                .default_memory()
                .map(|m| NumberOrText::Text(m.to_string()));
        }

        match self.coordinator.launch(options).await {
            Ok(started) => {
                if !started.keep_shell_open {
                    self.window.minimize();
                }
                json!({
                    "success": true,
                    "message": format!("Minecraft {} launched", started.version),
                })
            }
            Err(e) => {
                tracing::warn!("{}", e);
                failure(e)
            }
        }
    }

    fn set_setting(&self, key: &str, value: &Value) -> Value {
        let text = setting_text(value);
        match self.settings.set(key, &text) {
            Ok(settings) => {
                if key == DISCORD_RPC {
                    self.presence.set_enabled(settings.discord_rpc_enabled());
                }
                json!({ "success": true, "settings": settings })
            }
            Err(e) => failure(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kebab_case_commands() {
        let request: ShellRequest =
            serde_json::from_str(r#"{"command": "authenticate-microsoft"}"#).unwrap();
        assert!(matches!(request, ShellRequest::AuthenticateMicrosoft));

        let request: ShellRequest = serde_json::from_str(
            r#"{"command": "launch-minecraft", "options": {"version": "1.20.1", "memory": "6G"}}"#,
        )
        .unwrap();
        match request {
            ShellRequest::LaunchMinecraft { options } => {
                assert_eq!(options.version.as_deref(), Some("1.20.1"));
                assert_eq!(options.memory, Some(NumberOrText::Text("6G".to_string())));
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn browse_file_filters_are_optional() {
        let request: ShellRequest = serde_json::from_str(
            r#"{"command": "browse-file", "title": "Select Java Executable",
                "filters": [{"name": "Java Executable", "extensions": ["exe"]}]}"#,
        )
        .unwrap();
        match request {
            ShellRequest::BrowseFile { title, filters } => {
                assert_eq!(title.as_deref(), Some("Select Java Executable"));
                assert_eq!(filters[0].extensions, vec!["exe"]);
            }
            other => panic!("unexpected request: {other:?}"),
        }

        let bare: ShellRequest = serde_json::from_str(r#"{"command": "browse-file"}"#).unwrap();
        assert!(matches!(bare, ShellRequest::BrowseFile { title: None, .. }));
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(serde_json::from_str::<ShellRequest>(r#"{"command": "format-disk"}"#).is_err());
    }

    #[test]
    fn setting_values_are_stored_as_text() {
        assert_eq!(setting_text(&json!(false)), "false");
        assert_eq!(setting_text(&json!("6G")), "6G");
        assert_eq!(setting_text(&json!(4)), "4");
    }
}
