use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while reading or writing stored tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token file I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Token file {path} is not valid JSON: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for token storage.
pub type Result<T> = std::result::Result<T, TokenError>;

/// OAuth credentials with their lifetimes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds; `None` never expires.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Refresh token lifetime in seconds; `None` never expires.
    #[serde(default)]
    pub refresh_token_expires_in: Option<u64>,
    /// When the token was issued or last refreshed.
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_in", &self.expires_in)
            .field("refresh_token_expires_in", &self.refresh_token_expires_in)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl Token {
    /// A token that never expires and cannot be refreshed.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_in: None,
            refresh_token_expires_in: None,
            updated_at: Utc::now(),
        }
    }

    pub fn is_access_expired_at(&self, now: DateTime<Utc>) -> bool {
        is_expired(self.updated_at, self.expires_in, now)
    }

    /// A missing refresh token counts as expired.
    pub fn is_refresh_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.refresh_token.is_none()
            || is_expired(self.updated_at, self.refresh_token_expires_in, now)
    }
}

/// `updated_at + lifetime < now`; no lifetime means no expiry.
fn is_expired(updated_at: DateTime<Utc>, lifetime_secs: Option<u64>, now: DateTime<Utc>) -> bool {
    match lifetime_secs {
        Some(secs) => i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| updated_at.checked_add_signed(lifetime))
            .is_some_and(|expires_at| expires_at < now),
        None => false,
    }
}

/// Persistent home of the session's credentials.
///
/// With nothing stored, both expiry predicates report `true`.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// The stored token, if any.
    async fn load(&self) -> Result<Option<Token>>;

    /// Replace the stored token.
    async fn save(&self, token: Token) -> Result<()>;

    /// Forget the stored token.
    async fn clear(&self) -> Result<()>;

    async fn access_token(&self) -> Result<Option<String>> {
        Ok(self.load().await?.map(|t| t.access_token))
    }

    async fn refresh_token(&self) -> Result<Option<String>> {
        Ok(self.load().await?.and_then(|t| t.refresh_token))
    }

    async fn is_access_expired(&self) -> Result<bool> {
        let now = Utc::now();
        Ok(self
            .load()
            .await?
            .is_none_or(|t| t.is_access_expired_at(now)))
    }

    async fn is_refresh_expired(&self) -> Result<bool> {
        let now = Utc::now();
        Ok(self
            .load()
            .await?
            .is_none_or(|t| t.is_refresh_expired_at(now)))
    }
}

/// Token store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<Token>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: Token) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<Token>> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn save(&self, token: Token) -> Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}

/// Token store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> TokenError {
        TokenError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<Token>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| TokenError::Format {
                path: self.path.clone(),
                source,
            })
    }

    async fn save(&self, token: Token) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_vec_pretty(&token).map_err(|source| TokenError::Format {
            path: self.path.clone(),
            source,
        })?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| self.io_error(e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| self.io_error(e))?;
        }

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}
