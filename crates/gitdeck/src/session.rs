//! Login state: stored credentials plus the retry work tied to them.

mod token;

use std::sync::Arc;

use tokio::sync::watch;

use crate::work::BackoffWorkManager;

pub use token::{FileTokenStore, MemoryTokenStore, Result, Token, TokenError, TokenStore};

/// Whether the user is signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedIn,
    LoggedOut,
}

struct SessionInner {
    tokens: Arc<dyn TokenStore>,
    work: BackoffWorkManager,
    state: watch::Sender<SessionState>,
}

/// Owns the token store and the work manager. Cheap to clone.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Build a session whose initial state reflects the stored token.
    pub async fn restore(tokens: Arc<dyn TokenStore>, work: BackoffWorkManager) -> Result<Self> {
        let state = if tokens.access_token().await?.is_some() {
            SessionState::LoggedIn
        } else {
            SessionState::LoggedOut
        };
        tracing::debug!(?state, "Session restored");
        Ok(Self {
            inner: Arc::new(SessionInner {
                tokens,
                work,
                state: watch::Sender::new(state),
            }),
        })
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.inner.tokens
    }

    pub fn work(&self) -> &BackoffWorkManager {
        &self.inner.work
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Observe login state; the receiver starts at the current value.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Store a freshly issued token and mark the session logged in.
    pub async fn login(&self, token: Token) -> Result<()> {
        self.inner.tokens.save(token).await?;
        self.inner.state.send_replace(SessionState::LoggedIn);
        tracing::info!("Logged in");
        Ok(())
    }

    /// Forget the token and cancel all pending work.
    ///
    /// The session ends up logged out even if clearing the store fails; the
    /// storage error is still returned. Work is cancelled last, so a retry
    /// task that triggers the logout is not cut off halfway through it.
    pub async fn logout(&self) -> Result<()> {
        let cleared = self.inner.tokens.clear().await;
        self.inner.state.send_replace(SessionState::LoggedOut);
        self.inner.work.clear_work();
        match &cleared {
            Ok(()) => tracing::info!("Logged out"),
            Err(e) => tracing::warn!(error = %e, "Logged out, but the stored token could not be removed"),
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::work::{CallOutcome, RetryPolicy};

    use super::*;

    #[tokio::test]
    async fn restore_reflects_stored_token() {
        let empty = Session::restore(Arc::new(MemoryTokenStore::new()), BackoffWorkManager::new())
            .await
            .unwrap();
        assert_eq!(empty.state(), SessionState::LoggedOut);

        let stored = Session::restore(
            Arc::new(MemoryTokenStore::with_token(Token::new("gho_x"))),
            BackoffWorkManager::new(),
        )
        .await
        .unwrap();
        assert_eq!(stored.state(), SessionState::LoggedIn);
    }

    #[tokio::test]
    async fn login_then_logout_publishes_state() {
        let session = Session::restore(Arc::new(MemoryTokenStore::new()), BackoffWorkManager::new())
            .await
            .unwrap();
        let mut rx = session.watch();

        session.login(Token::new("gho_x")).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), SessionState::LoggedIn);

        session.logout().await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), SessionState::LoggedOut);
        assert!(session.tokens().access_token().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn logout_clears_pending_work() {
        let session = Session::restore(
            Arc::new(MemoryTokenStore::with_token(Token::new("gho_x"))),
            BackoffWorkManager::new(),
        )
        .await
        .unwrap();
        session.work().add_retry(
            "star_1",
            RetryPolicy::new(5, Duration::from_secs(1), Duration::from_secs(60), 2.0),
            || async { CallOutcome::Transient("unreachable") },
        );
        assert!(session.work().is_active("star_1"));

        session.logout().await.unwrap();
        assert!(session.work().is_empty());
        assert_eq!(session.state(), SessionState::LoggedOut);
    }
}
