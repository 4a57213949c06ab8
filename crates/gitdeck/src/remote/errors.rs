use thiserror::Error;

use crate::work::CallOutcome;

/// Errors returned by a remote repository source.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// The host could not be reached, or the connection dropped.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The remote is throttling requests; try again later.
    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    /// Credentials are missing, expired or rejected.
    #[error("Authentication required")]
    Unauthorized,

    /// Repository (or user) does not exist or is not visible.
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Anything else: malformed payloads, unexpected statuses, server errors.
    #[error("API error: {message}")]
    Api { message: String },
}

/// Coarse classification that drives retry and recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Retry with backoff. Includes rate limiting.
    Network,
    /// Log the user out.
    Unauthorized,
    /// Roll back and report an invalid repository.
    NotFound,
    /// Surface without rollback.
    Other,
}

impl RemoteError {
    #[inline]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    #[inline]
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
        }
    }

    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    #[inline]
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } | Self::RateLimited { .. } => ErrorKind::Network,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Api { .. } => ErrorKind::Other,
        }
    }

    /// Only network failures and rate limiting are worth retrying.
    #[inline]
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Network
    }
}

impl<T> From<std::result::Result<T, RemoteError>> for CallOutcome<RemoteError> {
    fn from(result: std::result::Result<T, RemoteError>) -> Self {
        match result {
            Ok(_) => CallOutcome::Success,
            Err(e) if e.is_transient() => CallOutcome::Transient(e),
            Err(e) => CallOutcome::Permanent(e),
        }
    }
}

/// Result type for remote operations.
pub type Result<T> = std::result::Result<T, RemoteError>;
