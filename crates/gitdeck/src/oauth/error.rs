//! OAuth error types.

use thiserror::Error;

use crate::session::TokenError;

/// Errors that can occur during the authorization-code flow.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to parse a response or callback.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The callback did not arrive in time.
    #[error("Authorization expired. Please try again.")]
    Expired,

    /// User denied the authorization request.
    #[error("Authorization was denied by the user.")]
    AccessDenied,

    /// Invalid state parameter (CSRF protection failed).
    #[error("Invalid state parameter. This may be a CSRF attack.")]
    InvalidState,

    /// The code or refresh token was rejected.
    #[error("Grant rejected: {0}")]
    InvalidGrant(String),

    /// The callback server failed.
    #[error("Callback server error: {0}")]
    Server(String),

    /// Storing the issued token failed.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Any other error reported by the provider.
    #[error("GitHub error: {error}: {message}")]
    Provider { error: String, message: String },
}

impl OAuthError {
    /// Build from an `error` / `error_description` pair.
    pub fn from_provider(error: impl Into<String>, description: Option<String>) -> Self {
        let error = error.into();
        let message = description.unwrap_or_else(|| error.clone());
        match error.as_str() {
            "access_denied" => Self::AccessDenied,
            "bad_verification_code" | "bad_refresh_token" | "invalid_grant" => {
                Self::InvalidGrant(message)
            }
            _ => Self::Provider { error, message },
        }
    }
}

/// Result type for OAuth operations.
pub type Result<T> = std::result::Result<T, OAuthError>;
