//! Loopback receiver for the authorization redirect.
//!
//! ```ignore
//! let server = CallbackServer::bind(DEFAULT_CALLBACK_PORT, &state).await?;
//! let url = build_authorize_url(&config, &server.redirect_uri(), &state);
//! let code = server.wait_for_code(Duration::from_secs(300)).await?;
//! ```

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Router,
    extract::{Query, State},
    response::Html,
    routing::get,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use super::error::{OAuthError, Result};

/// Default port for the callback server.
pub const DEFAULT_CALLBACK_PORT: u16 = 18484;

/// Build the redirect URI for a callback server on `port`.
pub fn redirect_uri(port: u16) -> String {
    format!("http://127.0.0.1:{port}/callback")
}

/// Query parameters of the redirect.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

type Reply = oneshot::Sender<Result<String>>;

struct Pending {
    expected_state: String,
    reply: Mutex<Option<Reply>>,
}

/// A bound loopback listener waiting for one redirect.
pub struct CallbackServer {
    listener: TcpListener,
    expected_state: String,
}

impl CallbackServer {
    /// Bind `127.0.0.1:port`. Port 0 picks a free port.
    pub async fn bind(port: u16, expected_state: impl Into<String>) -> Result<Self> {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| OAuthError::Server(format!("Failed to bind to port {port}: {e}")))?;
        Ok(Self {
            listener,
            expected_state: expected_state.into(),
        })
    }

    pub fn port(&self) -> u16 {
        self.listener.local_addr().map(|a| a.port()).unwrap_or_default()
    }

    /// Redirect URI to register in the authorization request.
    pub fn redirect_uri(&self) -> String {
        redirect_uri(self.port())
    }

    /// Serve until the first redirect arrives and return its code.
    pub async fn wait_for_code(self, timeout: Duration) -> Result<String> {
        let (tx, rx) = oneshot::channel();
        let pending = Arc::new(Pending {
            expected_state: self.expected_state,
            reply: Mutex::new(Some(tx)),
        });
        let app = Router::new()
            .route("/callback", get(handle_callback))
            .with_state(pending);

        tracing::debug!(
            addr = ?self.listener.local_addr().ok(),
            "Waiting for OAuth callback"
        );
        let server = axum::serve(self.listener, app);

        tokio::select! {
            result = rx => result.unwrap_or_else(|_| {
                Err(OAuthError::Server("Callback channel closed unexpectedly".into()))
            }),
            _ = tokio::time::sleep(timeout) => Err(OAuthError::Expired),
            result = server => match result {
                Ok(()) => Err(OAuthError::Server("Server shut down unexpectedly".into())),
                Err(e) => Err(OAuthError::Server(format!("Server error: {e}"))),
            },
        }
    }
}

async fn handle_callback(
    State(pending): State<Arc<Pending>>,
    Query(params): Query<CallbackParams>,
) -> Html<&'static str> {
    let result = check_callback(&pending.expected_state, params);
    let page = if result.is_ok() { SUCCESS_HTML } else { ERROR_HTML };

    let reply = pending
        .reply
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .take();
    if let Some(reply) = reply {
        let _ = reply.send(result);
    }
    Html(page)
}

/// Validate the redirect and extract the code.
fn check_callback(expected_state: &str, params: CallbackParams) -> Result<String> {
    if let Some(error) = params.error {
        return Err(OAuthError::from_provider(error, params.error_description));
    }
    if params.state.as_deref() != Some(expected_state) {
        return Err(OAuthError::InvalidState);
    }
    params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| OAuthError::Parse("Missing authorization code in callback".into()))
}

const SUCCESS_HTML: &str = "<!doctype html><html><head><title>gitdeck</title></head>\
<body><h1>Signed in</h1><p>You can close this window and return to the terminal.</p></body></html>";

const ERROR_HTML: &str = "<!doctype html><html><head><title>gitdeck</title></head>\
<body><h1>Sign-in failed</h1><p>Return to the terminal for details.</p></body></html>";
