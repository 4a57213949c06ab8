//! Authorization-code and refresh-token exchange against GitHub.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::{OAuthError, Result};
use crate::session::{Session, Token};

/// GitHub's web host, which serves the OAuth endpoints.
pub const DEFAULT_OAUTH_URL: &str = "https://github.com";

/// Scope needed to star and unstar on the user's behalf.
pub const DEFAULT_SCOPE: &str = "public_repo";

/// Registered OAuth app.
#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    /// Host serving `/login/oauth/*`.
    pub base_url: String,
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scope", &self.scope)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OAuthConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: DEFAULT_SCOPE.to_string(),
            base_url: DEFAULT_OAUTH_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn token_url(&self) -> String {
        format!("{}/login/oauth/access_token", self.base_url)
    }
}

/// Random, URL-safe value for the `state` parameter.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// URL the user opens to grant access.
pub fn build_authorize_url(config: &OAuthConfig, redirect_uri: &str, state: &str) -> String {
    format!(
        "{}/login/oauth/authorize?client_id={}&redirect_uri={}&scope={}&state={}",
        config.base_url,
        urlencoding::encode(&config.client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(&config.scope),
        urlencoding::encode(state),
    )
}

/// Successful token endpoint response.
#[derive(Clone, Deserialize, Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub refresh_token_expires_in: Option<u64>,
}

impl std::fmt::Debug for AccessTokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("expires_in", &self.expires_in)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("refresh_token_expires_in", &self.refresh_token_expires_in)
            .finish()
    }
}

impl AccessTokenResponse {
    /// Stamp the lifetimes with the current time.
    pub fn into_token(self) -> Token {
        Token {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_in: self.expires_in,
            refresh_token_expires_in: self.refresh_token_expires_in,
            updated_at: Utc::now(),
        }
    }
}

/// GitHub reports grant errors with a 200 status.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenResponse {
    Issued(AccessTokenResponse),
    Rejected(TokenErrorResponse),
}

async fn request_token(
    http: &reqwest::Client,
    config: &OAuthConfig,
    form: &[(&str, &str)],
) -> Result<Token> {
    let response = http
        .post(config.token_url())
        .header("Accept", "application/json")
        .form(form)
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    match serde_json::from_str::<TokenResponse>(&body) {
        Ok(TokenResponse::Issued(issued)) if status.is_success() => Ok(issued.into_token()),
        Ok(TokenResponse::Rejected(e)) => {
            Err(OAuthError::from_provider(e.error, e.error_description))
        }
        _ => Err(OAuthError::Parse(format!(
            "Token endpoint returned {status}: {body}"
        ))),
    }
}

/// Exchange an authorization code for a token.
pub async fn exchange_code(
    http: &reqwest::Client,
    config: &OAuthConfig,
    code: &str,
    redirect_uri: &str,
) -> Result<Token> {
    tracing::debug!("Exchanging authorization code");
    request_token(
        http,
        config,
        &[
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ],
    )
    .await
}

/// Trade a refresh token for a new token pair.
pub async fn refresh_access_token(
    http: &reqwest::Client,
    config: &OAuthConfig,
    refresh_token: &str,
) -> Result<Token> {
    tracing::debug!("Refreshing access token");
    request_token(
        http,
        config,
        &[
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ],
    )
    .await
}

/// Access token usable right now.
///
/// An expired access token is refreshed while the refresh token is still
/// valid. Otherwise, or when the refresh is rejected, the session is logged
/// out and `None` is returned.
pub async fn fresh_access_token(
    session: &Session,
    http: &reqwest::Client,
    config: &OAuthConfig,
) -> Result<Option<String>> {
    let Some(token) = session.tokens().load().await? else {
        return Ok(None);
    };
    let now = Utc::now();
    if !token.is_access_expired_at(now) {
        return Ok(Some(token.access_token));
    }

    let refresh = token
        .refresh_token
        .as_deref()
        .filter(|_| !token.is_refresh_expired_at(now));
    if let Some(refresh) = refresh {
        match refresh_access_token(http, config, refresh).await {
            Ok(fresh) => {
                let access = fresh.access_token.clone();
                session.login(fresh).await?;
                tracing::info!("Access token refreshed");
                return Ok(Some(access));
            }
            Err(OAuthError::InvalidGrant(reason)) => {
                tracing::warn!(%reason, "Refresh token rejected");
            }
            Err(e) => return Err(e),
        }
    }

    tracing::warn!("Session expired, logging out");
    session.logout().await?;
    Ok(None)
}
