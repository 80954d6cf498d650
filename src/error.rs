use thiserror::Error;

use crate::launch::SessionState;

#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("Missing required dependencies: {}", .0.join(", "))]
    DependencyMissing(Vec<String>),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not authenticated. Please sign in with Microsoft first")]
    NotAuthenticated,

    #[error("Launcher is busy ({0})")]
    SessionBusy(SessionState),

    #[error("Failed to launch: {0}")]
    LaunchAssembly(String),

    #[error("Failed to fetch versions: {0}")]
    MetadataFetch(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LauncherError>;
