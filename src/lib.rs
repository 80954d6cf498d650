pub mod auth;
pub mod config;
pub mod deps;
pub mod discord;
pub mod error;
pub mod launch;
pub mod logging;
pub mod presence;
pub mod settings;
pub mod shell;

use std::sync::Arc;

use tokio::sync::Notify;

use auth::{AuthenticationAdapter, CredentialStorage, MicrosoftProvider};
use config::LauncherConfig;
use discord::{DiscordPresence, DiscordState};
use error::LauncherError;
use launch::{Coordinator, JavaLauncher, LaunchDefaults, VersionManifestClient};
use presence::PresenceHub;
use settings::SettingsStore;
use shell::{ControlAccess, ControlEndpoint, ControlServer, HeadlessWindow, NativeDialogs, Shell};

pub use error::Result;

pub fn run() {
    let config = match LauncherConfig::load_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {}; using default configuration", e);
            LauncherConfig::default()
        }
    };

    let guard = logging::init_logging(&config);

    if let Err(e) = deps::ensure_dependencies(&config.dependency_targets()) {
        tracing::error!("{}", e);
        deps::show_dependency_error(&e);
        drop(guard);
        std::process::exit(1);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {}", e);
            drop(guard);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(serve(config)) {
        tracing::error!("{}", e);
        drop(runtime);
        drop(guard);
        std::process::exit(1);
    }
}

async fn serve(config: LauncherConfig) -> Result<()> {
    let settings = Arc::new(SettingsStore::open(&config.data_dir).map_err(LauncherError::Storage)?);

    let mut hub = PresenceHub::new(settings.snapshot().discord_rpc_enabled());
    let discord = Arc::new(DiscordState::init(config.discord_app_id, &config.app_label));
    hub.add_publisher(Box::new(DiscordPresence::new(discord)));
    let presence = Arc::new(hub);

    let auth = AuthenticationAdapter::new(
        Arc::new(MicrosoftProvider::new(config.microsoft_client_id.clone())),
        Some(CredentialStorage::new(&config.data_dir)),
    );

    let coordinator = Arc::new(Coordinator::new(
        auth,
        Arc::new(JavaLauncher::new()),
        presence.clone(),
        VersionManifestClient::new(config.version_manifest_url.clone()),
        LaunchDefaults {
            version: config.default_version.clone(),
            game_dir: config.game_dir.clone(),
            java_path: config.java_path.clone(),
        },
        &config.app_label,
    ));
    coordinator.announce();

    let shutdown = Arc::new(Notify::new());
    let shell = Arc::new(Shell::new(
        coordinator,
        settings,
        presence,
        Arc::new(HeadlessWindow::new(shutdown.clone())),
        Arc::new(NativeDialogs),
    ));

    let access = ControlAccess::generate(config.control_allowed_origins.clone());
    let token = access.token.clone();
    let server = ControlServer::start(
        &config.control_bind,
        shell,
        tokio::runtime::Handle::current(),
        access,
    )
    .map_err(|e| LauncherError::Io(std::io::Error::other(e)))?;

    let endpoint = ControlEndpoint {
        port: server.port,
        token,
    };
    match endpoint.write(&config.data_dir) {
        Ok(path) => tracing::info!("Control endpoint written to {}", path.display()),
        Err(e) => {
            server.stop();
            return Err(LauncherError::Storage(e));
        }
    }

    tokio::select! {
        _ = shutdown.notified() => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
    }

    server.stop();
    ControlEndpoint::remove(&config.data_dir);
    tracing::info!("Fusion Launcher shut down");

    Ok(())
}
