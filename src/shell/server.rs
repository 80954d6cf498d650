//! Local HTTP endpoint the front end talks to.
//!
//! `POST /invoke` takes a JSON shell request and answers with the command's
//! JSON result. `GET /status` reports the session state. Both require the
//! per-run token from `control.json` in the `X-Fusion-Token` header, and
//! browser requests are only answered for configured origins.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tiny_http::{Header, Method, Request, Response, Server};
use tokio::runtime::Handle;

use super::commands::{Shell, ShellRequest};

pub const TOKEN_HEADER: &str = "X-Fusion-Token";
const HANDOFF_FILE: &str = "control.json";

/// Who may talk to the control server
#[derive(Debug, Clone)]
pub struct ControlAccess {
    pub token: String,
    pub allowed_origins: Vec<String>,
}

impl ControlAccess {
    /// Fresh random token for this run
    pub fn generate(allowed_origins: Vec<String>) -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = bytes.iter().map(|b| format!("{:02x}", b)).collect();

        Self {
            token,
            allowed_origins,
        }
    }

    fn origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }
}

/// Written to the data directory so the front end can find and call us
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlEndpoint {
    pub port: u16,
    pub token: String,
}

impl ControlEndpoint {
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(HANDOFF_FILE)
    }

    pub fn write(&self, data_dir: &Path) -> Result<PathBuf, String> {
        fs::create_dir_all(data_dir)
            .map_err(|e| format!("Failed to create app data directory: {}", e))?;

        let path = Self::path(data_dir);
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize control endpoint: {}", e))?;
        fs::write(&path, contents)
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
                .map_err(|e| format!("Failed to restrict {}: {}", path.display(), e))?;
        }

        Ok(path)
    }

    pub fn read(data_dir: &Path) -> Result<Self, String> {
        let contents = fs::read_to_string(Self::path(data_dir))
            .map_err(|e| format!("Failed to read control endpoint: {}", e))?;
        serde_json::from_str(&contents).map_err(|e| format!("Invalid control endpoint: {}", e))
    }

    pub fn remove(data_dir: &Path) {
        let path = Self::path(data_dir);
        if path.exists() {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

/// The parts of a request that decide whether it is served
struct RequestMeta {
    origin: Option<String>,
    token: Option<String>,
    content_type: Option<String>,
}

impl RequestMeta {
    fn of(request: &Request) -> Self {
        let header = |name: &'static str| {
            request
                .headers()
                .iter()
                .find(|h| h.field.equiv(name))
                .map(|h| h.value.as_str().to_string())
        };

        Self {
            origin: header("Origin"),
            token: header(TOKEN_HEADER),
            content_type: header("Content-Type"),
        }
    }
}

/// Status code and message for a refused request
type Refusal = (u16, &'static str);

fn check_access(access: &ControlAccess, method: &Method, meta: &RequestMeta) -> Result<(), Refusal> {
    if let Some(origin) = &meta.origin {
        if !access.origin_allowed(origin) {
            return Err((403, "Origin not allowed"));
        }
    }

    if meta.token.as_deref() != Some(access.token.as_str()) {
        return Err((401, "Missing or invalid control token"));
    }

    if *method == Method::Post {
        let is_json = meta
            .content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().eq_ignore_ascii_case("application/json"))
            .unwrap_or(false);
        if !is_json {
            return Err((415, "Content-Type must be application/json"));
        }
    }

    Ok(())
}

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

/// CORS headers, only ever naming an allowed origin
fn cors_headers(access: &ControlAccess, origin: Option<&str>) -> Vec<Header> {
    match origin {
        Some(origin) if access.origin_allowed(origin) => [
            ("Access-Control-Allow-Origin", origin),
            ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
            ("Access-Control-Allow-Headers", "Content-Type, X-Fusion-Token"),
            ("Vary", "Origin"),
        ]
        .into_iter()
        .filter_map(|(name, value)| header(name, value))
        .collect(),
        _ => Vec::new(),
    }
}

fn json_response(
    status: u16,
    body: &serde_json::Value,
    cors: &[Header],
) -> Response<std::io::Cursor<Vec<u8>>> {
    let mut response = Response::from_string(body.to_string()).with_status_code(status);
    if let Some(content_type) = header("Content-Type", "application/json") {
        response.add_header(content_type);
    }
    for h in cors {
        response.add_header(h.clone());
    }
    response
}

fn failure_body(message: &str) -> serde_json::Value {
    serde_json::json!({ "success": false, "message": message })
}

pub struct ControlServer {
    server: Arc<Server>,
    pub port: u16,
}

impl ControlServer {
    /// Bind and start serving on a background thread. Commands run on `runtime`.
    pub fn start(
        bind: &str,
        shell: Arc<Shell>,
        runtime: Handle,
        access: ControlAccess,
    ) -> Result<Self, String> {
        let server = Server::http(bind)
            .map_err(|e| format!("Failed to start control server on {}: {}", bind, e))?;

        let port = server
            .server_addr()
            .to_ip()
            .ok_or("Failed to get server address")?
            .port();

        tracing::info!("Control server listening on http://127.0.0.1:{}", port);

        let server = Arc::new(server);
        let serving = Arc::clone(&server);
        thread::spawn(move || Self::run_server(serving, shell, runtime, access));

        Ok(Self { server, port })
    }

    /// Stop accepting requests; the serving thread exits
    pub fn stop(&self) {
        tracing::info!("Stopping control server");
        self.server.unblock();
    }

    fn run_server(server: Arc<Server>, shell: Arc<Shell>, runtime: Handle, access: ControlAccess) {
        for mut request in server.incoming_requests() {
            let method = request.method().clone();
            let path = request.url().split('?').next().unwrap_or("").to_string();
            let meta = RequestMeta::of(&request);
            let cors = cors_headers(&access, meta.origin.as_deref());
            tracing::debug!("Control server received {} {}", method, path);

            if method == Method::Options {
                let status = if cors.is_empty() { 403 } else { 204 };
                let mut response = Response::empty(status);
                for h in cors {
                    response.add_header(h);
                }
                request.respond(response).ok();
                continue;
            }

            if let Err((status, message)) = check_access(&access, &method, &meta) {
                tracing::warn!(
                    "Refused {} {} from {:?}: {}",
                    method,
                    path,
                    meta.origin,
                    message
                );
                request
                    .respond(json_response(status, &failure_body(message), &cors))
                    .ok();
                continue;
            }

            match (method, path.as_str()) {
                (Method::Post, "/invoke") => {
                    let parsed = Self::read_request(&mut request);
                    let shell = Arc::clone(&shell);
                    // Sign-in can take minutes; never block the accept loop
                    runtime.spawn(async move {
                        let response = match parsed {
                            Ok(command) => json_response(200, &shell.dispatch(command).await, &cors),
                            Err(message) => json_response(400, &failure_body(&message), &cors),
                        };
                        request.respond(response).ok();
                    });
                }
                (Method::Get, "/status") => {
                    let response = runtime.block_on(shell.dispatch(ShellRequest::GetSessionState));
                    request.respond(json_response(200, &response, &cors)).ok();
                }
                _ => {
                    request
                        .respond(json_response(404, &failure_body("Not found"), &cors))
                        .ok();
                }
            }
        }

        tracing::debug!("Control server loop exited");
    }

    fn read_request(request: &mut Request) -> Result<ShellRequest, String> {
        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .map_err(|e| format!("Failed to read request body: {}", e))?;

        serde_json::from_str(&body).map_err(|e| format!("Invalid command: {}", e))
    }
}
