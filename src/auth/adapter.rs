use std::sync::Arc;

use async_trait::async_trait;

use super::{Credential, CredentialStorage};
use crate::error::{LauncherError, Result};

/// An external sign-in flow that yields game credentials
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the name of this provider (for logging)
    fn name(&self) -> &'static str;

    /// Run the interactive sign-in flow
    async fn sign_in(&self) -> std::result::Result<Credential, String>;

    /// Obtain a fresh credential from the refresh token of `credential`
    async fn refresh(&self, credential: &Credential) -> std::result::Result<Credential, String>;
}

/// Normalizes provider results and keeps the stored copy in sync
pub struct AuthenticationAdapter {
    provider: Arc<dyn IdentityProvider>,
    storage: Option<CredentialStorage>,
}

impl AuthenticationAdapter {
    pub fn new(provider: Arc<dyn IdentityProvider>, storage: Option<CredentialStorage>) -> Self {
        Self { provider, storage }
    }

    pub async fn authenticate(&self) -> Result<Credential> {
        tracing::info!("Starting {} sign-in", self.provider.name());

        let credential = self
            .provider
            .sign_in()
            .await
            .map_err(LauncherError::Authentication)?;

        tracing::info!("Signed in as {}", credential.display_name);
        self.persist(&credential);

        Ok(credential)
    }

    /// Load the stored credential, refreshing it when the token has expired
    pub async fn restore(&self) -> Result<Option<Credential>> {
        let Some(storage) = &self.storage else {
            return Ok(None);
        };

        let stored = match storage.load().map_err(LauncherError::Storage)? {
            Some(credential) => credential,
            None => return Ok(None),
        };

        if !stored.is_expired() {
            tracing::info!("Restored saved sign-in for {}", stored.display_name);
            return Ok(Some(stored));
        }

        if stored.token.refresh_token.is_none() {
            tracing::info!("Saved sign-in expired and cannot be refreshed");
            storage.clear().ok();
            return Ok(None);
        }

        tracing::info!("Saved sign-in expired, refreshing");
        match self.provider.refresh(&stored).await {
            Ok(credential) => {
                self.persist(&credential);
                Ok(Some(credential))
            }
            Err(e) => {
                tracing::warn!("Refresh failed: {}", e);
                storage.clear().ok();
                Ok(None)
            }
        }
    }

    /// Drop the stored credential. Never fails.
    pub fn forget(&self) {
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.clear() {
                tracing::warn!("Failed to clear stored credential: {}", e);
            }
        }
    }

    fn persist(&self, credential: &Credential) {
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.store(credential) {
                tracing::warn!("Failed to store credential: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::GameToken;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn credential(name: &str, expires_at: i64, refresh: Option<&str>) -> Credential {
        Credential {
            display_name: name.to_string(),
            unique_id: format!("{}-uuid", name),
            token: GameToken {
                access_token: format!("{}-token", name),
                refresh_token: refresh.map(str::to_string),
                expires_at,
                xuid: None,
            },
        }
    }

    struct FakeProvider {
        sign_in: std::result::Result<Credential, String>,
        refresh: std::result::Result<Credential, String>,
        refresh_calls: AtomicUsize,
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        fn name(&self) -> &'static str {
            "Fake"
        }

        async fn sign_in(&self) -> std::result::Result<Credential, String> {
            self.sign_in.clone()
        }

        async fn refresh(&self, _: &Credential) -> std::result::Result<Credential, String> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            self.refresh.clone()
        }
    }

    fn provider(
        sign_in: std::result::Result<Credential, String>,
        refresh: std::result::Result<Credential, String>,
    ) -> Arc<FakeProvider> {
        Arc::new(FakeProvider {
            sign_in,
            refresh,
            refresh_calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn successful_sign_in_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let fresh = credential("steve", 4_000_000_000, None);
        let adapter = AuthenticationAdapter::new(
            provider(Ok(fresh.clone()), Err("unused".into())),
            Some(CredentialStorage::new(dir.path())),
        );

        assert_eq!(adapter.authenticate().await.unwrap(), fresh);
        assert_eq!(adapter.restore().await.unwrap(), Some(fresh));
    }

    #[tokio::test]
    async fn provider_failure_maps_to_authentication_error() {
        let adapter = AuthenticationAdapter::new(
            provider(Err("user cancelled".into()), Err("unused".into())),
            None,
        );

        match adapter.authenticate().await {
            Err(LauncherError::Authentication(msg)) => assert_eq!(msg, "user cancelled"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn expired_credential_is_refreshed() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CredentialStorage::new(dir.path());
        storage
            .store(&credential("alex", 0, Some("refresh")))
            .unwrap();

        let renewed = credential("alex", 4_000_000_000, Some("refresh-2"));
        let fake = provider(Err("unused".into()), Ok(renewed.clone()));
        let adapter = AuthenticationAdapter::new(fake.clone(), Some(storage));

        assert_eq!(adapter.restore().await.unwrap(), Some(renewed.clone()));
        assert_eq!(fake.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            CredentialStorage::new(dir.path()).load().unwrap(),
            Some(renewed)
        );
    }

    #[tokio::test]
    async fn failed_refresh_drops_stored_credential() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CredentialStorage::new(dir.path());
        storage
            .store(&credential("alex", 0, Some("refresh")))
            .unwrap();

        let adapter = AuthenticationAdapter::new(
            provider(Err("unused".into()), Err("invalid_grant".into())),
            Some(storage),
        );

        assert_eq!(adapter.restore().await.unwrap(), None);
        assert_eq!(CredentialStorage::new(dir.path()).load().unwrap(), None);
    }

    #[tokio::test]
    async fn expired_without_refresh_token_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CredentialStorage::new(dir.path());
        storage.store(&credential("alex", 0, None)).unwrap();

        let fake = provider(Err("unused".into()), Err("unused".into()));
        let adapter = AuthenticationAdapter::new(fake.clone(), Some(storage));

        assert_eq!(adapter.restore().await.unwrap(), None);
        assert_eq!(fake.refresh_calls.load(Ordering::SeqCst), 0);
    }
}
