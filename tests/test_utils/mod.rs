#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use fusion_launcher::auth::{
    AuthenticationAdapter, Credential, CredentialStorage, GameToken, IdentityProvider,
};
use fusion_launcher::launch::{
    Coordinator, LaunchAck, LaunchDefaults, LaunchEvent, LaunchEvents, LaunchRequest, LaunchSdk,
    SessionState, VersionManifestClient,
};
use fusion_launcher::presence::{PresenceHub, PresencePublisher, PresenceState};

pub const APP_LABEL: &str = "Fusion Launcher";

pub fn credential(name: &str) -> Credential {
    Credential {
        display_name: name.to_string(),
        unique_id: format!("{}-uuid", name),
        token: GameToken {
            access_token: format!("{}-access", name),
            refresh_token: Some(format!("{}-refresh", name)),
            expires_at: 4_000_000_000,
            xuid: None,
        },
    }
}

/// Identity provider whose next sign-in outcome is set by the test
pub struct FakeProvider {
    pub next: Mutex<Result<Credential, String>>,
}

impl FakeProvider {
    pub fn succeeding(name: &str) -> Arc<Self> {
        Arc::new(Self {
            next: Mutex::new(Ok(credential(name))),
        })
    }

    pub fn set_next(&self, outcome: Result<Credential, String>) {
        *self.next.lock().unwrap() = outcome;
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "Fake"
    }

    async fn sign_in(&self) -> Result<Credential, String> {
        self.next.lock().unwrap().clone()
    }

    async fn refresh(&self, credential: &Credential) -> Result<Credential, String> {
        Ok(credential.clone())
    }
}

/// Launch backend that records requests and lets the test drive events
#[derive(Default)]
pub struct FakeSdk {
    pub requests: Mutex<Vec<LaunchRequest>>,
    senders: Mutex<Vec<LaunchEvents>>,
    pub fail_with: Mutex<Option<String>>,
}

impl FakeSdk {
    pub fn emit(&self, event: LaunchEvent) {
        let senders = self.senders.lock().unwrap();
        senders
            .last()
            .expect("no launch in progress")
            .send(event)
            .expect("coordinator stopped listening");
    }

    /// Drop the event senders without reporting an exit
    pub fn hang_up(&self) {
        self.senders.lock().unwrap().clear();
    }

    pub fn last_request(&self) -> LaunchRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no launch request recorded")
    }

    pub fn launch_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LaunchSdk for FakeSdk {
    async fn launch(&self, request: LaunchRequest, events: LaunchEvents) -> Result<LaunchAck, String> {
        if let Some(message) = self.fail_with.lock().unwrap().clone() {
            return Err(message);
        }

        self.requests.lock().unwrap().push(request);
        self.senders.lock().unwrap().push(events);
        Ok(LaunchAck { pid: Some(4242) })
    }
}

#[derive(Default)]
pub struct PresenceLog {
    pub published: Mutex<Vec<PresenceState>>,
    pub clears: Mutex<usize>,
}

impl PresenceLog {
    pub fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn last_state_text(&self) -> Option<String> {
        self.published
            .lock()
            .unwrap()
            .last()
            .map(|p| p.state.clone())
    }
}

pub struct RecordingPublisher(pub Arc<PresenceLog>);

impl PresencePublisher for RecordingPublisher {
    fn name(&self) -> &'static str {
        "Recording"
    }

    fn publish(&self, state: &PresenceState) {
        self.0.published.lock().unwrap().push(state.clone());
    }

    fn clear(&self) {
        *self.0.clears.lock().unwrap() += 1;
    }
}

pub struct Harness {
    pub coordinator: Arc<Coordinator>,
    pub provider: Arc<FakeProvider>,
    pub sdk: Arc<FakeSdk>,
    pub presence: Arc<PresenceHub>,
    pub presence_log: Arc<PresenceLog>,
    pub data_dir: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_manifest_url("http://127.0.0.1:9/version_manifest.json")
    }

    pub fn with_manifest_url(url: &str) -> Self {
        let data_dir = tempfile::tempdir().unwrap();
        let provider = FakeProvider::succeeding("Steve");
        let sdk = Arc::new(FakeSdk::default());

        let presence_log = Arc::new(PresenceLog::default());
        let mut hub = PresenceHub::new(true);
        hub.add_publisher(Box::new(RecordingPublisher(presence_log.clone())));
        let presence = Arc::new(hub);

        let coordinator = Arc::new(Coordinator::new(
            AuthenticationAdapter::new(
                provider.clone(),
                Some(CredentialStorage::new(data_dir.path())),
            ),
            sdk.clone(),
            presence.clone(),
            VersionManifestClient::new(url),
            LaunchDefaults {
                version: "1.20.1".to_string(),
                game_dir: PathBuf::from("/games/minecraft"),
                java_path: None,
            },
            APP_LABEL,
        ));

        Self {
            coordinator,
            provider,
            sdk,
            presence,
            presence_log,
            data_dir,
        }
    }

    pub fn data_path(&self) -> &Path {
        self.data_dir.path()
    }

    pub async fn wait_for_state(&self, expected: SessionState) {
        let mut changes = self.coordinator.subscribe();
        tokio::time::timeout(Duration::from_secs(5), changes.wait_for(|s| *s == expected))
            .await
            .expect("timed out waiting for session state")
            .expect("session state channel closed");
    }
}

/// A version manifest listing `count` versions, newest first
pub fn manifest_json(count: usize) -> String {
    let versions: Vec<serde_json::Value> = (0..count)
        .map(|i| {
            let kind = if i % 5 == 0 { "snapshot" } else { "release" };
            serde_json::json!({
                "id": format!("1.{}.0", 40 - i),
                "type": kind,
                "url": format!("https://example.invalid/{}.json", i),
                "releaseTime": "2024-01-01T00:00:00+00:00",
            })
        })
        .collect();

    serde_json::json!({
        "latest": { "release": "1.40.0", "snapshot": "1.40.0" },
        "versions": versions,
    })
    .to_string()
}

/// Serve a fixed response on a local port; returns the URL
pub fn serve_static(status: u16, body: String) -> String {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().to_ip().unwrap().port();

    thread::spawn(move || {
        for request in server.incoming_requests() {
            let response = tiny_http::Response::from_string(body.clone()).with_status_code(status);
            request.respond(response).ok();
        }
    });

    format!("http://127.0.0.1:{}/mc/game/version_manifest.json", port)
}
