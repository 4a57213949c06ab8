//! GitHub OAuth authorization-code flow.
//!
//! - [`callback`] - Loopback server receiving the redirect
//! - [`exchange`] - Code and refresh-token exchange
//!
//! ```ignore
//! let state = generate_state();
//! let server = CallbackServer::bind(DEFAULT_CALLBACK_PORT, &state).await?;
//! println!("Open {}", build_authorize_url(&config, &server.redirect_uri(), &state));
//! let redirect = server.redirect_uri();
//! let code = server.wait_for_code(Duration::from_secs(300)).await?;
//! let token = exchange_code(&http, &config, &code, &redirect).await?;
//! session.login(token).await?;
//! ```

pub mod callback;
mod error;
pub mod exchange;

pub use callback::{CallbackServer, DEFAULT_CALLBACK_PORT, redirect_uri};
pub use error::{OAuthError, Result};
pub use exchange::{
    AccessTokenResponse, DEFAULT_OAUTH_URL, DEFAULT_SCOPE, OAuthConfig, build_authorize_url,
    exchange_code, fresh_access_token, generate_state, refresh_access_token,
};
