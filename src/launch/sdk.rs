use async_trait::async_trait;
use tokio::sync::mpsc;

use super::options::LaunchRequest;

/// Notifications from a running game, in the order the backend produced them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchEvent {
    /// Launcher-side diagnostics
    Debug(String),
    /// A line of game output
    Data(String),
    /// The game process exited
    Close(i32),
}

/// Returned once the game process has been started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchAck {
    pub pid: Option<u32>,
}

pub type LaunchEvents = mpsc::UnboundedSender<LaunchEvent>;

/// Backend that turns a launch request into a running game.
///
/// `launch` returns as soon as the process is started. Everything after that
/// is reported through `events`, ending with exactly one `Close`.
#[async_trait]
pub trait LaunchSdk: Send + Sync {
    async fn launch(&self, request: LaunchRequest, events: LaunchEvents) -> Result<LaunchAck, String>;
}
