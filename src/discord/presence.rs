//! Discord Rich Presence integration using discord-sdk

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use discord_sdk::{
    activity::{ActivityBuilder, Assets},
    registration::{Application, LaunchCommand},
    wheel::{UserState, Wheel},
    Discord, Subscriptions,
};
use tokio::sync::mpsc;

use crate::presence::{PresencePublisher, PresenceState};

/// Timeout for waiting for Discord handshake
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

enum DiscordUpdate {
    Publish(PresenceState),
    Clear,
}

/// Handle to the background task that owns the Discord connection
pub struct DiscordState {
    update_tx: mpsc::UnboundedSender<DiscordUpdate>,
}

impl DiscordState {
    /// Register the application and spawn the connection task.
    ///
    /// Must be called from within a tokio runtime. The connection is made
    /// once; if Discord is not running or the handshake fails, updates are
    /// dropped for the rest of the run.
    pub fn init(app_id: i64, app_label: &str) -> Self {
        match std::env::current_exe() {
            Ok(path) => {
                if let Err(e) = discord_sdk::registration::register_app(Application {
                    id: app_id,
                    name: Some(app_label.to_string()),
                    command: LaunchCommand::Bin {
                        path,
                        args: Vec::new(),
                    },
                }) {
                    tracing::warn!("Failed to register Discord app: {:?}", e);
                }
            }
            Err(e) => tracing::warn!("Cannot resolve launcher path for Discord: {}", e),
        }

        let (update_tx, update_rx) = mpsc::unbounded_channel();
        tokio::spawn(Self::run_discord_task(app_id, update_rx));

        Self { update_tx }
    }

    async fn run_discord_task(app_id: i64, mut update_rx: mpsc::UnboundedReceiver<DiscordUpdate>) {
        let (wheel, handler) = Wheel::new(Box::new(|err| {
            tracing::warn!("Discord error: {:?}", err);
        }));

        let mut user_spoke = wheel.user();

        let discord = match Discord::new(app_id, Subscriptions::ACTIVITY, Box::new(handler)) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("Discord not available: {:?}", e);
                return;
            }
        };

        tracing::info!("Discord connecting...");

        let handshake = tokio::time::timeout(HANDSHAKE_TIMEOUT, async {
            if user_spoke.0.changed().await.is_err() {
                return Err("Discord connection closed".to_string());
            }
            match &*user_spoke.0.borrow() {
                UserState::Connected(user) => Ok(user.username.clone()),
                UserState::Disconnected(err) => Err(format!("Discord disconnected: {:?}", err)),
            }
        })
        .await;

        match handshake {
            Ok(Ok(username)) => tracing::info!("Discord RPC is active as {}", username),
            Ok(Err(e)) => {
                tracing::warn!("{}", e);
                return;
            }
            Err(_) => {
                tracing::warn!("Discord handshake timed out");
                return;
            }
        }

        while let Some(update) = update_rx.recv().await {
            let result = match update {
                DiscordUpdate::Publish(state) => {
                    let started_at: SystemTime = state.started_at.into();
                    let activity = ActivityBuilder::new()
                        .details(state.details)
                        .state(state.state)
                        .start_timestamp(started_at)
                        .assets(Assets::default().large(state.icon_key, Some(state.icon_text)));
                    discord.update_activity(activity).await.map(|_| ())
                }
                DiscordUpdate::Clear => discord.clear_activity().await.map(|_| ()),
            };

            if let Err(e) = result {
                tracing::debug!("Failed to update Discord activity: {:?}", e);
            }
        }

        discord.disconnect().await;
        tracing::info!("Discord Rich Presence disconnected");
    }

    fn send(&self, update: DiscordUpdate) {
        if self.update_tx.send(update).is_err() {
            tracing::debug!("Discord task has stopped; dropping presence update");
        }
    }
}

/// Discord presence publisher implementing the generic PresencePublisher trait
pub struct DiscordPresence {
    state: Arc<DiscordState>,
}

impl DiscordPresence {
    pub fn new(state: Arc<DiscordState>) -> Self {
        Self { state }
    }
}

impl PresencePublisher for DiscordPresence {
    fn name(&self) -> &'static str {
        "Discord"
    }

    fn publish(&self, state: &PresenceState) {
        self.state.send(DiscordUpdate::Publish(state.clone()));
    }

    fn clear(&self) {
        self.state.send(DiscordUpdate::Clear);
    }
}
