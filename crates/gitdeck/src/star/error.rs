use thiserror::Error;

use crate::cache::CacheError;
use crate::remote::{ErrorKind, RemoteError};

/// Errors surfaced by the star engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The repository has not been loaded into the cache.
    #[error("Repository {0} is not cached")]
    NotCached(i64),

    /// The remote says the repository does not exist.
    #[error("Repository {full_name} no longer exists")]
    InvalidRepository { full_name: String },

    /// Credentials were rejected; the session has been logged out.
    #[error("Session expired")]
    SessionExpired,

    /// Network or API failure that needs no local recovery.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Cache(CacheError),

    /// The background dispatch ended without reporting back.
    #[error("Star request was interrupted")]
    Interrupted,
}

impl From<CacheError> for SyncError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::NotFound { id } => Self::NotCached(id),
            other => Self::Cache(other),
        }
    }
}

/// What dismissing an error dialog should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dismissal {
    /// Send the user back to the login screen.
    Relogin,
    /// Just close the dialog.
    Close,
}

impl SyncError {
    /// Message to show the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotCached(_) => "This repository is not loaded yet.".to_string(),
            Self::InvalidRepository { full_name } => {
                format!("{full_name} is no longer available.")
            }
            Self::SessionExpired => "Your session has expired. Please log in again.".to_string(),
            Self::Remote(RemoteError::RateLimited { .. }) => {
                "GitHub is rate limiting requests. Try again in a few minutes.".to_string()
            }
            Self::Remote(e) if e.kind() == ErrorKind::Network => {
                "Network unavailable. Check your connection and try again.".to_string()
            }
            Self::Remote(e) => format!("Something went wrong: {e}"),
            Self::Cache(_) => "Could not update the local cache.".to_string(),
            Self::Interrupted => "The request was interrupted.".to_string(),
        }
    }

    pub fn dismissal(&self) -> Dismissal {
        match self {
            Self::SessionExpired => Dismissal::Relogin,
            _ => Dismissal::Close,
        }
    }

    /// Whether a detail screen showing this error should close on dismissal.
    ///
    /// True for missing repositories and unclassified failures; network
    /// trouble and session expiry leave the screen alone.
    pub fn closes_detail(&self) -> bool {
        match self {
            Self::SessionExpired => false,
            Self::Remote(e) => e.kind() == ErrorKind::Other,
            Self::NotCached(_)
            | Self::InvalidRepository { .. }
            | Self::Cache(_)
            | Self::Interrupted => true,
        }
    }
}

/// Result type for star engine operations.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_expiry_asks_for_relogin() {
        assert_eq!(SyncError::SessionExpired.dismissal(), Dismissal::Relogin);
        assert!(!SyncError::SessionExpired.closes_detail());
        assert!(SyncError::SessionExpired.user_message().contains("log in"));
    }

    #[test]
    fn missing_and_unknown_errors_close_detail() {
        let missing = SyncError::InvalidRepository {
            full_name: "octocat/gone".to_string(),
        };
        assert!(missing.closes_detail());
        assert_eq!(missing.dismissal(), Dismissal::Close);
        assert!(missing.user_message().contains("octocat/gone"));

        let unknown = SyncError::Remote(RemoteError::api("502 Bad Gateway"));
        assert!(unknown.closes_detail());
    }

    #[test]
    fn missing_cache_rows_become_not_cached() {
        let err = SyncError::from(CacheError::NotFound { id: 7 });
        assert!(matches!(err, SyncError::NotCached(7)));
    }

    #[test]
    fn network_errors_keep_detail_open() {
        let offline = SyncError::Remote(RemoteError::network("connection refused"));
        assert!(!offline.closes_detail());
        assert_eq!(offline.dismissal(), Dismissal::Close);
        assert!(offline.user_message().contains("Network"));

        let throttled = SyncError::Remote(RemoteError::rate_limited("API rate limit exceeded"));
        assert!(!throttled.closes_detail());
        assert_eq!(throttled.dismissal(), Dismissal::Close);
        assert!(throttled.user_message().contains("rate limiting"));
    }
}
