//! Turning the UI's loosely-typed launch form into a launch request.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::auth::Credential;
use crate::error::{LauncherError, Result};

/// The minimum heap is fixed; only the maximum follows the user's choice
pub const MIN_MEMORY: &str = "2G";
pub const DEFAULT_MAX_MEMORY: &str = "4G";

/// Form fields may arrive as either JSON numbers or strings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(u64),
    Text(String),
}

/// Launch form exactly as the UI sends it
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLaunchOptions {
    pub version: Option<String>,
    pub memory: Option<NumberOrText>,
    pub game_directory: Option<String>,
    pub java_path: Option<String>,
    pub jvm_args: Option<String>,
    pub window_width: Option<NumberOrText>,
    pub window_height: Option<NumberOrText>,
    #[serde(default)]
    pub fullscreen: bool,
    #[serde(default)]
    pub demo_mode: bool,
    #[serde(default)]
    pub keep_launcher_open: bool,
}

/// Values used when the form leaves a field empty
#[derive(Debug, Clone)]
pub struct LaunchDefaults {
    pub version: String,
    pub game_dir: PathBuf,
    pub java_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemorySpec {
    pub max: String,
    pub min: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub credential: Credential,
    pub version_id: String,
    pub memory: MemorySpec,
    pub install_directory: PathBuf,
    pub java_path: Option<PathBuf>,
    pub extra_jvm_args: Option<String>,
    pub window_dimensions: Option<(u32, u32)>,
    pub fullscreen: bool,
    pub demo_mode: bool,
    pub keep_shell_open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionSpec {
    pub number: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowSpec {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fullscreen: bool,
}

/// What the launch backend consumes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchRequest {
    pub authorization: Credential,
    pub root: PathBuf,
    pub version: VersionSpec,
    pub memory: MemorySpec,
    pub java_path: Option<PathBuf>,
    pub custom_args: Vec<String>,
    pub window: Option<WindowSpec>,
    pub demo: bool,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Accepts `4G`, `4096M`, `4g` or a bare number of gigabytes
pub fn normalize_memory(value: &NumberOrText) -> Result<String> {
    let text = match value {
        NumberOrText::Number(n) => n.to_string(),
        NumberOrText::Text(t) => t.trim().to_string(),
    };

    let (digits, unit) = match text.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&text[..idx], c.to_ascii_uppercase()),
        _ => (text.as_str(), 'G'),
    };

    let valid_unit = matches!(unit, 'G' | 'M');
    let amount: u64 = digits.parse().unwrap_or(0);
    if !valid_unit || amount == 0 {
        return Err(LauncherError::LaunchAssembly(format!(
            "Invalid memory amount: {}",
            text
        )));
    }

    Ok(format!("{}{}", amount, unit))
}

fn parse_dimension(name: &str, value: &NumberOrText) -> Result<u32> {
    let parsed = match value {
        NumberOrText::Number(n) => u32::try_from(*n).ok(),
        NumberOrText::Text(t) => t.trim().parse().ok(),
    };

    parsed.filter(|v| *v > 0).ok_or_else(|| {
        LauncherError::LaunchAssembly(format!("Invalid window {}: {:?}", name, value))
    })
}

impl LaunchOptions {
    /// Build the options for one launch. Requires a signed-in credential.
    pub fn assemble(
        credential: Option<&Credential>,
        raw: &RawLaunchOptions,
        defaults: &LaunchDefaults,
    ) -> Result<Self> {
        let credential = credential.ok_or(LauncherError::NotAuthenticated)?.clone();

        let version_id = non_empty(&raw.version)
            .unwrap_or(&defaults.version)
            .to_string();

        let max = match &raw.memory {
            Some(memory) => normalize_memory(memory)?,
            None => DEFAULT_MAX_MEMORY.to_string(),
        };

        let window_dimensions = match (&raw.window_width, &raw.window_height) {
            (Some(w), Some(h)) => Some((parse_dimension("width", w)?, parse_dimension("height", h)?)),
            (None, None) => None,
            _ => {
                return Err(LauncherError::LaunchAssembly(
                    "Window width and height must be set together".to_string(),
                ))
            }
        };

        Ok(Self {
            credential,
            version_id,
            memory: MemorySpec {
                max,
                min: MIN_MEMORY.to_string(),
            },
            install_directory: non_empty(&raw.game_directory)
                .map(PathBuf::from)
                .unwrap_or_else(|| defaults.game_dir.clone()),
            java_path: non_empty(&raw.java_path)
                .map(PathBuf::from)
                .or_else(|| defaults.java_path.clone()),
            extra_jvm_args: non_empty(&raw.jvm_args).map(str::to_string),
            window_dimensions,
            fullscreen: raw.fullscreen,
            demo_mode: raw.demo_mode,
            keep_shell_open: raw.keep_launcher_open,
        })
    }

    pub fn to_request(&self) -> LaunchRequest {
        let window = match (self.window_dimensions, self.fullscreen) {
            (None, false) => None,
            (dims, fullscreen) => Some(WindowSpec {
                width: dims.map(|(w, _)| w),
                height: dims.map(|(_, h)| h),
                fullscreen,
            }),
        };

        LaunchRequest {
            authorization: self.credential.clone(),
            root: self.install_directory.clone(),
            version: VersionSpec {
                number: self.version_id.clone(),
                kind: "release".to_string(),
            },
            memory: self.memory.clone(),
            java_path: self.java_path.clone(),
            custom_args: self
                .extra_jvm_args
                .as_deref()
                .map(|args| args.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            window,
            demo: self.demo_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::GameToken;

    fn credential() -> Credential {
        Credential {
            display_name: "Steve".to_string(),
            unique_id: "uuid".to_string(),
            token: GameToken {
                access_token: "token".to_string(),
                refresh_token: None,
                expires_at: 0,
                xuid: None,
            },
        }
    }

    fn defaults() -> LaunchDefaults {
        LaunchDefaults {
            version: "1.20.1".to_string(),
            game_dir: PathBuf::from("/games/minecraft"),
            java_path: None,
        }
    }

    fn raw(json: &str) -> RawLaunchOptions {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn requires_credential() {
        let err = LaunchOptions::assemble(None, &RawLaunchOptions::default(), &defaults());
        assert!(matches!(err, Err(LauncherError::NotAuthenticated)));
    }

    #[test]
    fn empty_form_uses_defaults() {
        let opts = LaunchOptions::assemble(Some(&credential()), &raw("{}"), &defaults()).unwrap();
        assert_eq!(opts.version_id, "1.20.1");
        assert_eq!(
            opts.memory,
            MemorySpec {
                max: "4G".to_string(),
                min: "2G".to_string()
            }
        );
        assert_eq!(opts.install_directory, PathBuf::from("/games/minecraft"));
        assert_eq!(opts.window_dimensions, None);
        assert!(!opts.keep_shell_open);
    }

    #[test]
    fn min_memory_ignores_user_value() {
        let opts = LaunchOptions::assemble(
            Some(&credential()),
            &raw(r#"{"version": "1.20.1", "memory": "8G"}"#),
            &defaults(),
        )
        .unwrap();
        assert_eq!(opts.memory.min, "2G");
        assert_eq!(opts.memory.max, "8G");
    }

    #[test]
    fn memory_is_normalized() {
        let cases = [
            (NumberOrText::Number(6), "6G"),
            (NumberOrText::Text("6".into()), "6G"),
            (NumberOrText::Text(" 3g ".into()), "3G"),
            (NumberOrText::Text("4096M".into()), "4096M"),
        ];
        for (input, expected) in cases {
            assert_eq!(normalize_memory(&input).unwrap(), expected);
        }

        for bad in ["", "G", "lots", "4T", "0G"] {
            assert!(normalize_memory(&NumberOrText::Text(bad.into())).is_err(), "{bad}");
        }
    }

    #[test]
    fn blank_strings_fall_back() {
        let opts = LaunchOptions::assemble(
            Some(&credential()),
            &raw(r#"{"version": "  ", "gameDirectory": "", "jvmArgs": " "}"#),
            &defaults(),
        )
        .unwrap();
        assert_eq!(opts.version_id, "1.20.1");
        assert_eq!(opts.install_directory, PathBuf::from("/games/minecraft"));
        assert_eq!(opts.extra_jvm_args, None);
    }

    #[test]
    fn window_accepts_strings_and_numbers() {
        let opts = LaunchOptions::assemble(
            Some(&credential()),
            &raw(r#"{"windowWidth": "1280", "windowHeight": 720}"#),
            &defaults(),
        )
        .unwrap();
        assert_eq!(opts.window_dimensions, Some((1280, 720)));
    }

    #[test]
    fn invalid_window_is_an_assembly_error() {
        for json in [
            r#"{"windowWidth": "wide", "windowHeight": "720"}"#,
            r#"{"windowWidth": "1280"}"#,
            r#"{"windowWidth": 0, "windowHeight": 720}"#,
        ] {
            let result = LaunchOptions::assemble(Some(&credential()), &raw(json), &defaults());
            assert!(
                matches!(result, Err(LauncherError::LaunchAssembly(_))),
                "{json}"
            );
        }
    }

    #[test]
    fn request_carries_form_choices() {
        let opts = LaunchOptions::assemble(
            Some(&credential()),
            &raw(
                r#"{"version": "1.19.4", "memory": "6G", "javaPath": "/usr/bin/java",
                    "jvmArgs": "-XX:+UseG1GC  -Dfoo=bar", "fullscreen": true, "demoMode": true}"#,
            ),
            &defaults(),
        )
        .unwrap();

        let request = opts.to_request();
        assert_eq!(request.version.number, "1.19.4");
        assert_eq!(request.version.kind, "release");
        assert_eq!(request.java_path, Some(PathBuf::from("/usr/bin/java")));
        assert_eq!(request.custom_args, vec!["-XX:+UseG1GC", "-Dfoo=bar"]);
        assert_eq!(
            request.window,
            Some(WindowSpec {
                width: None,
                height: None,
                fullscreen: true
            })
        );
        assert!(request.demo);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["memory"]["min"], "2G");
        assert_eq!(json["memory"]["max"], "6G");
        assert_eq!(json["version"]["type"], "release");
    }
}
