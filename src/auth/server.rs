//! Loopback HTTP listener that receives the OAuth redirect.

use std::collections::HashMap;
use std::time::Duration;

use tiny_http::{Header, Response, Server};
use url::Url;

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);
const CALLBACK_PATH: &str = "/callback";

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Fusion Launcher</title>
    <style>
        body {
            background: #0f1117;
            color: {{COLOR}};
            font-family: system-ui, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
            margin: 0;
        }
        .card {
            text-align: center;
            border: 1px solid {{COLOR}};
            border-radius: 12px;
            padding: 40px 60px;
        }
        h1 { margin: 0 0 16px; }
        p { margin: 0; opacity: 0.7; }
    </style>
</head>
<body>
    <div class="card">
        <h1>{{TITLE}}</h1>
        <p>{{MESSAGE}}</p>
    </div>
</body>
</html>"#;

fn page(success: bool, message: &str) -> String {
    let (color, title) = if success {
        ("#00d4ff", "Signed in")
    } else {
        ("#ff4d4f", "Sign-in failed")
    };

    PAGE_TEMPLATE
        .replace("{{COLOR}}", color)
        .replace("{{TITLE}}", title)
        .replace("{{MESSAGE}}", message)
}

fn html_response(status: u16, body: String) -> Response<std::io::Cursor<Vec<u8>>> {
    let mut response = Response::from_string(body).with_status_code(status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"text/html"[..]) {
        response.add_header(header);
    }
    response
}

#[derive(Debug, PartialEq, Eq)]
pub struct CallbackResult {
    pub code: String,
}

/// What a single request to the listener means for the sign-in flow
#[derive(Debug, PartialEq, Eq)]
enum CallbackOutcome {
    /// Not the redirect (favicon and the like); keep waiting
    Ignored,
    Completed(CallbackResult),
    Failed(String),
}

fn interpret(request_url: &str, expected_state: Option<&str>) -> CallbackOutcome {
    let url = match Url::parse(&format!("http://127.0.0.1{}", request_url)) {
        Ok(url) => url,
        Err(e) => return CallbackOutcome::Failed(format!("Failed to parse callback URL: {}", e)),
    };

    if url.path() != CALLBACK_PATH {
        return CallbackOutcome::Ignored;
    }

    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

    if let Some(error) = params.get("error") {
        let description = params
            .get("error_description")
            .map(String::as_str)
            .unwrap_or("Unknown error");
        return CallbackOutcome::Failed(format!("OAuth error: {} - {}", error, description));
    }

    let Some(code) = params.get("code") else {
        return CallbackOutcome::Failed("Missing authorization code in callback".to_string());
    };

    if let Some(expected) = expected_state {
        if params.get("state").map(String::as_str) != Some(expected) {
            return CallbackOutcome::Failed("State mismatch - possible CSRF attack".to_string());
        }
    }

    CallbackOutcome::Completed(CallbackResult { code: code.clone() })
}

pub struct CallbackServer {
    server: Server,
    expected_state: Option<String>,
    pub port: u16,
}

impl CallbackServer {
    pub fn start() -> Result<Self, String> {
        let server = Server::http("127.0.0.1:0")
            .map_err(|e| format!("Failed to start callback server: {}", e))?;

        let port = server
            .server_addr()
            .to_ip()
            .ok_or("Failed to get server address")?
            .port();

        Ok(Self {
            server,
            expected_state: None,
            port,
        })
    }

    pub fn set_expected_state(&mut self, state: String) {
        self.expected_state = Some(state);
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}{}", self.port, CALLBACK_PATH)
    }

    /// Blocks until the browser is redirected back, or five minutes pass
    pub fn wait_for_callback(self) -> Result<CallbackResult, String> {
        loop {
            let request = match self.server.recv_timeout(CALLBACK_TIMEOUT) {
                Ok(Some(req)) => req,
                Ok(None) | Err(_) => {
                    return Err("Timed out waiting for the browser sign-in".to_string())
                }
            };

            tracing::debug!("Callback server received request: {}", request.url());

            match interpret(request.url(), self.expected_state.as_deref()) {
                CallbackOutcome::Ignored => {
                    request
                        .respond(Response::from_string("Not Found").with_status_code(404))
                        .ok();
                }
                CallbackOutcome::Failed(message) => {
                    request.respond(html_response(400, page(false, &message))).ok();
                    return Err(message);
                }
                CallbackOutcome::Completed(result) => {
                    let body = page(true, "You can close this window and return to the launcher.");
                    request.respond(html_response(200, body)).ok();
                    return Ok(result);
                }
            }
        }
    }
}
