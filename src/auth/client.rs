//! Microsoft account sign-in, exchanged through Xbox Live for a Minecraft
//! access token and profile.

use async_trait::async_trait;
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, CsrfToken, PkceCodeChallenge,
    RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use serde_json::json;

use super::adapter::IdentityProvider;
use super::server::CallbackServer;
use super::{Credential, GameToken};

const AUTH_URL: &str = "https://login.microsoftonline.com/consumers/oauth2/v2.0/authorize";
const TOKEN_URL: &str = "https://login.microsoftonline.com/consumers/oauth2/v2.0/token";
const XBOX_USER_AUTH_URL: &str = "https://user.auth.xboxlive.com/user/authenticate";
const XSTS_AUTH_URL: &str = "https://xsts.auth.xboxlive.com/xsts/authorize";
const MINECRAFT_LOGIN_URL: &str =
    "https://api.minecraftservices.com/authentication/login_with_xbox";
const MINECRAFT_PROFILE_URL: &str = "https://api.minecraftservices.com/minecraft/profile";

/// Microsoft tokens as returned by the OAuth token endpoint
struct MicrosoftTokens {
    access_token: String,
    refresh_token: Option<String>,
}

struct XboxToken {
    token: String,
    user_hash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct XboxAuthResponse {
    token: String,
    display_claims: XboxDisplayClaims,
}

#[derive(Debug, Deserialize)]
struct XboxDisplayClaims {
    xui: Vec<XboxUserInfo>,
}

#[derive(Debug, Deserialize)]
struct XboxUserInfo {
    uhs: String,
    xid: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct XstsErrorResponse {
    x_err: Option<u64>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MinecraftLoginResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct MinecraftProfile {
    id: String,
    name: String,
}

fn http_client() -> Result<oauth2::reqwest::Client, String> {
    oauth2::reqwest::ClientBuilder::new()
        .redirect(oauth2::reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))
}

/// Human-readable reason for the XSTS error codes players actually hit
fn describe_xsts_error(code: u64) -> &'static str {
    match code {
        2148916233 => "This Microsoft account has no Xbox profile. Create one at xbox.com first",
        2148916235 => "Xbox Live is not available in your country",
        2148916236 | 2148916237 => "This account needs adult verification on xbox.com",
        2148916238 => "This is a child account and must be added to a family by an adult",
        _ => "Xbox Live authorization was denied",
    }
}

pub struct MicrosoftProvider {
    client_id: String,
    http: reqwest::Client,
}

impl MicrosoftProvider {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            http: reqwest::Client::new(),
        }
    }

    fn oauth_client(
        &self,
    ) -> Result<
        BasicClient<
            oauth2::EndpointSet,
            oauth2::EndpointNotSet,
            oauth2::EndpointNotSet,
            oauth2::EndpointNotSet,
            oauth2::EndpointSet,
        >,
        String,
    > {
        let auth_url =
            AuthUrl::new(AUTH_URL.to_string()).map_err(|e| format!("Invalid auth URL: {}", e))?;
        let token_url = TokenUrl::new(TOKEN_URL.to_string())
            .map_err(|e| format!("Invalid token URL: {}", e))?;

        Ok(BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url))
    }

    /// Browser-based authorization code flow with PKCE
    async fn authorize_in_browser(&self) -> Result<MicrosoftTokens, String> {
        let mut server = CallbackServer::start()?;
        let redirect_uri = server.redirect_uri();
        let redirect_url = RedirectUrl::new(redirect_uri)
            .map_err(|e| format!("Invalid redirect URI: {}", e))?;

        let client = self.oauth_client()?.set_redirect_uri(redirect_url);
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_token) = client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("XboxLive.signin".to_string()))
            .add_scope(Scope::new("offline_access".to_string()))
            .add_extra_param("prompt", "select_account")
            .set_pkce_challenge(pkce_challenge)
            .url();

        server.set_expected_state(csrf_token.secret().clone());

        open::that(auth_url.as_str()).map_err(|e| format!("Failed to open browser: {}", e))?;

        let callback = tokio::task::spawn_blocking(move || server.wait_for_callback())
            .await
            .map_err(|e| format!("Callback task failed: {}", e))??;

        tracing::info!("Callback received, exchanging code");

        let http = http_client()?;
        let token_response = client
            .exchange_code(AuthorizationCode::new(callback.code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http)
            .await
            .map_err(|e| format!("Failed to exchange code: {}", e))?;

        Ok(MicrosoftTokens {
            access_token: token_response.access_token().secret().clone(),
            refresh_token: token_response.refresh_token().map(|t| t.secret().clone()),
        })
    }

    async fn refresh_microsoft(&self, refresh_token: &str) -> Result<MicrosoftTokens, String> {
        tracing::debug!("Refreshing Microsoft tokens");
        let http = http_client()?;

        let token_response = self
            .oauth_client()?
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .add_scope(Scope::new("XboxLive.signin".to_string()))
            .add_scope(Scope::new("offline_access".to_string()))
            .request_async(&http)
            .await
            .map_err(|e| format!("Failed to refresh tokens: {}", e))?;

        Ok(MicrosoftTokens {
            access_token: token_response.access_token().secret().clone(),
            refresh_token: token_response
                .refresh_token()
                .map(|t| t.secret().clone())
                .or_else(|| Some(refresh_token.to_string())),
        })
    }

    async fn xbox_user_token(&self, ms_access_token: &str) -> Result<XboxToken, String> {
        tracing::debug!("Authenticating with Xbox Live");
        let body = json!({
            "Properties": {
                "AuthMethod": "RPS",
                "SiteName": "user.auth.xboxlive.com",
                "RpsTicket": format!("d={}", ms_access_token),
            },
            "RelyingParty": "http://auth.xboxlive.com",
            "TokenType": "JWT",
        });

        let response = self
            .http
            .post(XBOX_USER_AUTH_URL)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Failed to contact Xbox Live: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("Xbox Live authentication failed: {}", response.status()));
        }

        let parsed: XboxAuthResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse Xbox Live response: {}", e))?;

        let user_hash = parsed
            .display_claims
            .xui
            .first()
            .map(|x| x.uhs.clone())
            .ok_or("Xbox Live response has no user hash")?;

        Ok(XboxToken {
            token: parsed.token,
            user_hash,
        })
    }

    /// Returns the XSTS token and the account's xuid, when present
    async fn xsts_token(&self, user_token: &str) -> Result<(XboxToken, Option<String>), String> {
        tracing::debug!("Requesting XSTS authorization");
        let body = json!({
            "Properties": {
                "SandboxId": "RETAIL",
                "UserTokens": [user_token],
            },
            "RelyingParty": "rp://api.minecraftservices.com/",
            "TokenType": "JWT",
        });

        let response = self
            .http
            .post(XSTS_AUTH_URL)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Failed to contact XSTS: {}", e))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            let err: XstsErrorResponse = response
                .json()
                .await
                .map_err(|e| format!("Failed to parse XSTS error: {}", e))?;
            return Err(match err.x_err {
                Some(code) => describe_xsts_error(code).to_string(),
                None => err
                    .message
                    .unwrap_or_else(|| "Xbox Live authorization was denied".to_string()),
            });
        }

        if !response.status().is_success() {
            return Err(format!("XSTS authorization failed: {}", response.status()));
        }

        let parsed: XboxAuthResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse XSTS response: {}", e))?;

        let claims = parsed
            .display_claims
            .xui
            .into_iter()
            .next()
            .ok_or("XSTS response has no user claims")?;

        Ok((
            XboxToken {
                token: parsed.token,
                user_hash: claims.uhs,
            },
            claims.xid,
        ))
    }

    async fn minecraft_login(&self, xsts: &XboxToken) -> Result<MinecraftLoginResponse, String> {
        tracing::debug!("Logging in to Minecraft services");
        let body = json!({
            "identityToken": format!("XBL3.0 x={};{}", xsts.user_hash, xsts.token),
        });

        let response = self
            .http
            .post(MINECRAFT_LOGIN_URL)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Failed to contact Minecraft services: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("Minecraft login failed: {}", response.status()));
        }

        response
            .json()
            .await
            .map_err(|e| format!("Failed to parse Minecraft login response: {}", e))
    }

    async fn minecraft_profile(&self, access_token: &str) -> Result<MinecraftProfile, String> {
        tracing::debug!("Fetching Minecraft profile");
        let response = self
            .http
            .get(MINECRAFT_PROFILE_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| format!("Failed to fetch profile: {}", e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err("This account does not own Minecraft: Java Edition".to_string());
        }

        if !response.status().is_success() {
            return Err(format!("Profile request failed: {}", response.status()));
        }

        response
            .json()
            .await
            .map_err(|e| format!("Failed to parse profile: {}", e))
    }

    /// Microsoft token -> Xbox Live -> XSTS -> Minecraft token -> profile
    async fn exchange(&self, ms: MicrosoftTokens) -> Result<Credential, String> {
        let user = self.xbox_user_token(&ms.access_token).await?;
        let (xsts, xuid) = self.xsts_token(&user.token).await?;
        let login = self.minecraft_login(&xsts).await?;
        let profile = self.minecraft_profile(&login.access_token).await?;

        Ok(Credential {
            display_name: profile.name,
            unique_id: profile.id,
            token: GameToken {
                access_token: login.access_token,
                refresh_token: ms.refresh_token,
                expires_at: chrono::Utc::now().timestamp() + login.expires_in,
                xuid,
            },
        })
    }
}

#[async_trait]
impl IdentityProvider for MicrosoftProvider {
    fn name(&self) -> &'static str {
        "Microsoft"
    }

    async fn sign_in(&self) -> Result<Credential, String> {
        let ms = self.authorize_in_browser().await?;
        self.exchange(ms).await
    }

    async fn refresh(&self, credential: &Credential) -> Result<Credential, String> {
        let refresh_token = credential
            .token
            .refresh_token
            .as_deref()
            .ok_or("No refresh token available")?;

        let ms = self.refresh_microsoft(refresh_token).await?;
        self.exchange(ms).await
    }
}
