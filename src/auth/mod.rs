mod adapter;
mod client;
mod server;
mod storage;

use serde::{Deserialize, Serialize};

pub use adapter::{AuthenticationAdapter, IdentityProvider};
pub use client::MicrosoftProvider;
pub use storage::CredentialStorage;

/// Opaque token blob handed to the game on launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds)
    pub expires_at: i64,
    pub xuid: Option<String>,
}

/// Normalized identity produced by a successful sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub display_name: String,
    pub unique_id: String,
    pub token: GameToken,
}

impl Credential {
    /// Expired, or expiring within the next minute
    pub fn is_expired(&self) -> bool {
        self.token.expires_at <= chrono::Utc::now().timestamp() + 60
    }
}
