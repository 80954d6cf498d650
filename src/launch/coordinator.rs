//! Owns the launch session: who is signed in, whether a game is running, and
//! what presence reflects.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use super::options::{LaunchDefaults, LaunchOptions, RawLaunchOptions};
use super::sdk::{LaunchAck, LaunchEvent, LaunchSdk};
use super::session::{Session, SessionContext, SessionState};
use super::versions::{VersionEntry, VersionManifestClient, VERSION_LIST_LIMIT};
use crate::auth::{AuthenticationAdapter, Credential};
use crate::error::{LauncherError, Result};
use crate::presence::{presence_for, PresenceHub};

/// Result of a successful `launch` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchStarted {
    pub version: String,
    pub pid: Option<u32>,
    pub keep_shell_open: bool,
}

pub struct Coordinator {
    session: Arc<Session>,
    auth: AuthenticationAdapter,
    sdk: Arc<dyn LaunchSdk>,
    presence: Arc<PresenceHub>,
    versions: VersionManifestClient,
    defaults: LaunchDefaults,
    app_label: Arc<str>,
}

impl Coordinator {
    pub fn new(
        auth: AuthenticationAdapter,
        sdk: Arc<dyn LaunchSdk>,
        presence: Arc<PresenceHub>,
        versions: VersionManifestClient,
        defaults: LaunchDefaults,
        app_label: &str,
    ) -> Self {
        Self {
            session: Arc::new(Session::new()),
            auth,
            sdk,
            presence,
            versions,
            defaults,
            app_label: Arc::from(app_label),
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn credential(&self) -> Option<Credential> {
        self.session.snapshot().credential
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    /// Publish presence for the current state, used once at startup
    pub fn announce(&self) {
        let context = self.session.snapshot();
        self.presence.update(presence_for(
            &self.app_label,
            context.state,
            context.version.as_deref(),
        ));
    }

    pub async fn authenticate(&self) -> Result<Credential> {
        let prior = self.session.update(|ctx| {
            if !ctx.state.is_available() {
                return Err(LauncherError::SessionBusy(ctx.state));
            }
            let prior = ctx.state;
            ctx.state = SessionState::Authenticating;
            Ok(prior)
        })?;

        let result = self.auth.authenticate().await;

        self.session.update(|ctx| {
            ctx.state = prior;
            if let Ok(credential) = &result {
                ctx.credential = Some(credential.clone());
            }
        });

        result
    }

    /// Restore a previously saved sign-in, if there is one
    pub async fn restore(&self) -> Result<Option<Credential>> {
        if let Some(credential) = self.credential() {
            return Ok(Some(credential));
        }

        let restored = self.auth.restore().await?;
        if let Some(credential) = &restored {
            self.session.update(|ctx| {
                if ctx.credential.is_none() {
                    ctx.credential = Some(credential.clone());
                }
            });
        }

        Ok(self.credential())
    }

    /// Forget the credential. Idempotent and infallible.
    pub fn logout(&self) {
        tracing::info!("Logging out");
        self.session.update(|ctx| ctx.credential = None);
        self.auth.forget();
    }

    /// Return a closed session to idle
    pub fn reset(&self) {
        self.session.update(|ctx| {
            if let SessionState::Closed(_) = ctx.state {
                ctx.state = SessionState::Idle;
            }
        });
    }

    pub async fn launch(&self, raw: RawLaunchOptions) -> Result<LaunchStarted> {
        let (options, prior) = self.session.update(|ctx| {
            let options = LaunchOptions::assemble(ctx.credential.as_ref(), &raw, &self.defaults)?;
            if !ctx.state.is_available() {
                return Err(LauncherError::SessionBusy(ctx.state));
            }

            let prior = ctx.state;
            ctx.state = SessionState::Launching;
            ctx.version = Some(options.version_id.clone());
            self.presence.update(presence_for(
                &self.app_label,
                SessionState::Launching,
                Some(&options.version_id),
            ));
            Ok((options, prior))
        })?;

        tracing::info!(
            "Launching {} with {} memory for {}",
            options.version_id,
            options.memory.max,
            options.credential.display_name
        );

        let (events_tx, events_rx) = mpsc::unbounded_channel();

        match self.sdk.launch(options.to_request(), events_tx).await {
            Ok(LaunchAck { pid }) => {
                self.session.update(|ctx| {
                    ctx.state = SessionState::Running;
                    self.presence.update(presence_for(
                        &self.app_label,
                        SessionState::Running,
                        Some(&options.version_id),
                    ));
                });

                tokio::spawn(process_events(
                    self.session.clone(),
                    self.presence.clone(),
                    self.app_label.clone(),
                    events_rx,
                ));

                Ok(LaunchStarted {
                    version: options.version_id,
                    pid,
                    keep_shell_open: options.keep_shell_open,
                })
            }
            Err(message) => {
                tracing::error!("Launch failed: {}", message);
                self.session.update(|ctx| {
                    ctx.state = prior;
                    self.presence
                        .update(presence_for(&self.app_label, prior, ctx.version.as_deref()));
                });
                Err(LauncherError::LaunchAssembly(message))
            }
        }
    }

    pub async fn fetch_available_versions(&self) -> Result<Vec<VersionEntry>> {
        self.versions.fetch(VERSION_LIST_LIMIT).await
    }
}

/// Consume game events in arrival order until the process closes
async fn process_events(
    session: Arc<Session>,
    presence: Arc<PresenceHub>,
    app_label: Arc<str>,
    mut events: mpsc::UnboundedReceiver<LaunchEvent>,
) {
    let mut exit_code = None;

    while let Some(event) = events.recv().await {
        match event {
            LaunchEvent::Debug(line) => tracing::debug!(target: "launcher", "{}", line),
            LaunchEvent::Data(line) => tracing::info!(target: "game", "{}", line),
            LaunchEvent::Close(code) => {
                exit_code = Some(code);
                break;
            }
        }
    }

    let code = exit_code.unwrap_or_else(|| {
        tracing::warn!("Launch backend stopped without reporting an exit code");
        -1
    });
    tracing::info!("Game exited with code {}", code);

    session.update(|ctx: &mut SessionContext| {
        ctx.state = SessionState::Closed(code);
        presence.update(presence_for(&app_label, ctx.state, ctx.version.as_deref()));
    });
}
