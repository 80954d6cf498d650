//! Launch backend that starts an installed game version with a local Java
//! runtime. Downloading versions, libraries and assets is not done here.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use super::options::LaunchRequest;
use super::sdk::{LaunchAck, LaunchEvent, LaunchEvents, LaunchSdk};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionManifest {
    main_class: String,
    #[serde(default)]
    libraries: Vec<Library>,
    asset_index: Option<AssetIndex>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Library {
    downloads: Option<LibraryDownloads>,
    #[serde(default)]
    rules: Vec<Rule>,
}

#[derive(Debug, Deserialize)]
struct LibraryDownloads {
    artifact: Option<Artifact>,
}

#[derive(Debug, Deserialize)]
struct Artifact {
    path: String,
}

#[derive(Debug, Deserialize)]
struct AssetIndex {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Rule {
    action: String,
    os: Option<OsRule>,
}

#[derive(Debug, Deserialize)]
struct OsRule {
    name: Option<String>,
}

fn current_os() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

/// Later matching rules override earlier ones; no rules means allowed
fn library_allowed(rules: &[Rule]) -> bool {
    if rules.is_empty() {
        return true;
    }

    rules
        .iter()
        .filter(|rule| match rule.os.as_ref().and_then(|os| os.name.as_deref()) {
            Some(name) => name == current_os(),
            None => true,
        })
        .last()
        .map(|rule| rule.action == "allow")
        .unwrap_or(false)
}

fn version_dir(root: &Path, version: &str) -> PathBuf {
    root.join("versions").join(version)
}

fn load_manifest(root: &Path, version: &str) -> Result<VersionManifest, String> {
    let path = version_dir(root, version).join(format!("{}.json", version));
    let contents = std::fs::read_to_string(&path).map_err(|e| {
        format!(
            "Version {} is not installed in {} ({})",
            version,
            root.display(),
            e
        )
    })?;

    serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse version manifest for {}: {}", version, e))
}

fn classpath(root: &Path, version: &str, manifest: &VersionManifest) -> Result<String, String> {
    let libraries_dir = root.join("libraries");
    let entries = manifest
        .libraries
        .iter()
        .filter(|lib| library_allowed(&lib.rules))
        .filter_map(|lib| lib.downloads.as_ref()?.artifact.as_ref())
        .map(|artifact| libraries_dir.join(&artifact.path))
        .chain(std::iter::once(
            version_dir(root, version).join(format!("{}.jar", version)),
        ));

    std::env::join_paths(entries)
        .map(|joined| joined.to_string_lossy().to_string())
        .map_err(|e| format!("Invalid classpath entry: {}", e))
}

/// Program and arguments for one launch
fn build_command(request: &LaunchRequest, manifest: &VersionManifest) -> Result<(PathBuf, Vec<String>), String> {
    let root = &request.root;
    let version = &request.version.number;
    let credential = &request.authorization;

    let program = request
        .java_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("java"));

    let mut args = vec![
        format!("-Xms{}", request.memory.min),
        format!("-Xmx{}", request.memory.max),
    ];
    args.extend(request.custom_args.iter().cloned());
    args.push(format!(
        "-Djava.library.path={}",
        version_dir(root, version).join("natives").display()
    ));
    args.push("-cp".to_string());
    args.push(classpath(root, version, manifest)?);
    args.push(manifest.main_class.clone());

    let asset_index = manifest
        .asset_index
        .as_ref()
        .map(|a| a.id.clone())
        .unwrap_or_else(|| version.clone());
    let version_type = manifest
        .kind
        .clone()
        .unwrap_or_else(|| request.version.kind.clone());

    args.extend([
        "--username".to_string(),
        credential.display_name.clone(),
        "--version".to_string(),
        version.clone(),
        "--gameDir".to_string(),
        root.display().to_string(),
        "--assetsDir".to_string(),
        root.join("assets").display().to_string(),
        "--assetIndex".to_string(),
        asset_index,
        "--uuid".to_string(),
        credential.unique_id.clone(),
        "--accessToken".to_string(),
        credential.token.access_token.clone(),
        "--userType".to_string(),
        "msa".to_string(),
        "--versionType".to_string(),
        version_type,
    ]);

    if let Some(xuid) = &credential.token.xuid {
        args.extend(["--xuid".to_string(), xuid.clone()]);
    }

    if let Some(window) = &request.window {
        if let (Some(width), Some(height)) = (window.width, window.height) {
            args.extend([
                "--width".to_string(),
                width.to_string(),
                "--height".to_string(),
                height.to_string(),
            ]);
        }
        if window.fullscreen {
            args.push("--fullscreen".to_string());
        }
    }

    if request.demo {
        args.push("--demo".to_string());
    }

    Ok((program, args))
}

/// The command line with the access token masked, for diagnostics
fn describe_command(program: &Path, args: &[String]) -> String {
    let mut masked = Vec::with_capacity(args.len());
    let mut hide_next = false;
    for arg in args {
        masked.push(if hide_next { "********" } else { arg.as_str() });
        hide_next = arg == "--accessToken";
    }
    format!("{} {}", program.display(), masked.join(" "))
}

async fn forward_lines<R>(reader: R, events: LaunchEvents)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if events.send(LaunchEvent::Data(line)).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                events
                    .send(LaunchEvent::Debug(format!("Stopped reading game output: {}", e)))
                    .ok();
                break;
            }
        }
    }
}

/// Spawns `java` directly against an already installed game directory
#[derive(Debug, Default)]
pub struct JavaLauncher;

impl JavaLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LaunchSdk for JavaLauncher {
    async fn launch(&self, request: LaunchRequest, events: LaunchEvents) -> Result<LaunchAck, String> {
        let manifest = load_manifest(&request.root, &request.version.number)?;
        let (program, args) = build_command(&request, &manifest)?;

        events
            .send(LaunchEvent::Debug(format!(
                "Launching {}",
                describe_command(&program, &args)
            )))
            .ok();

        let mut child = Command::new(&program)
            .args(&args)
            .current_dir(&request.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("Failed to start {}: {}", program.display(), e))?;

        let pid = child.id();
        events
            .send(LaunchEvent::Debug(format!("Game process started (pid {:?})", pid)))
            .ok();

        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(forward_lines(stdout, events.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(forward_lines(stderr, events.clone())));
        }

        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => status.code().unwrap_or(-1),
                Err(e) => {
                    events
                        .send(LaunchEvent::Debug(format!("Failed to wait for game: {}", e)))
                        .ok();
                    -1
                }
            };

            // Output is fully drained before the close is reported
            for reader in readers {
                reader.await.ok();
            }

            events.send(LaunchEvent::Close(code)).ok();
        });

        Ok(LaunchAck { pid })
    }
}
