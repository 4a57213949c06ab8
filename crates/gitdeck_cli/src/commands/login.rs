//! `gitdeck login` / `gitdeck logout`.

use std::time::Duration;

use console::style;
use gitdeck::oauth::{CallbackServer, build_authorize_url, exchange_code, generate_state};

use super::shared::{App, CliResult};

/// How long to wait for the browser redirect.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Run the authorization-code flow through the loopback callback.
pub(crate) async fn handle_login(app: &App) -> CliResult {
    let oauth = app.config.oauth_config().ok_or(
        "GitHub OAuth app is not configured. Set github.client_id and github.client_secret \
         (or GITDECK_GITHUB__CLIENT_ID / GITDECK_GITHUB__CLIENT_SECRET).",
    )?;

    let state = generate_state();
    let server = CallbackServer::bind(app.config.oauth.callback_port, state.as_str()).await?;
    let redirect_uri = server.redirect_uri();
    let url = build_authorize_url(&oauth, &redirect_uri, &state);

    if app.is_tty {
        println!("Opening your browser to authorize gitdeck with GitHub.");
        println!("If it does not open, visit:\n\n  {}\n", style(&url).cyan());
    } else {
        tracing::info!(%url, "Open this URL to authorize gitdeck");
    }
    if let Err(e) = open::that(&url) {
        tracing::debug!(error = %e, "Could not open browser");
    }

    let code = server.wait_for_code(CALLBACK_TIMEOUT).await?;
    let token = exchange_code(&app.http, &oauth, &code, &redirect_uri).await?;
    app.session.login(token).await?;

    if app.is_tty {
        println!("{} Logged in.", style("✓").green().bold());
    } else {
        tracing::info!("GitHub authentication successful");
    }
    Ok(())
}

/// Forget the token and cancel pending retries.
pub(crate) async fn handle_logout(app: &App) -> CliResult {
    app.session.logout().await?;
    if app.is_tty {
        println!("{} Logged out.", style("✓").green().bold());
    }
    Ok(())
}
