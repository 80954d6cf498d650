use serde::{Deserialize, Serialize};

use crate::error::{LauncherError, Result};

/// How many versions the picker shows
pub const VERSION_LIST_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VersionManifest {
    versions: Vec<VersionEntry>,
}

/// Reads the public version manifest; one attempt per call
pub struct VersionManifestClient {
    url: String,
    http: reqwest::Client,
}

impl VersionManifestClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// The first `limit` versions, newest first as the manifest lists them
    pub async fn fetch(&self, limit: usize) -> Result<Vec<VersionEntry>> {
        tracing::debug!("Fetching version manifest from {}", self.url);

        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| LauncherError::MetadataFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LauncherError::MetadataFetch(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let manifest: VersionManifest = response
            .json()
            .await
            .map_err(|e| LauncherError::MetadataFetch(format!("Invalid manifest: {}", e)))?;

        let versions: Vec<VersionEntry> = manifest.versions.into_iter().take(limit).collect();
        tracing::info!("Loaded {} versions", versions.len());

        Ok(versions)
    }
}
