//! `gitdeck star` / `gitdeck unstar`.

use std::sync::Arc;

use console::style;
use gitdeck::cache::repos;
use gitdeck::remote::RemoteSource;
use gitdeck::session::TokenStore;
use gitdeck::star::{StarAction, StarOutcome, SyncError};
use gitdeck::StarState;

use super::shared::{App, CliResult, parse_full_name, report, star_marker};

/// Apply a star change locally, send it, and wait for any retries.
pub(crate) async fn handle_star(app: &App, full_name: &str, action: StarAction) -> CliResult {
    let (owner, name) = parse_full_name(full_name)?;
    let row = repos::find_by_full_name(app.cache.db(), owner, name)
        .await?
        .ok_or_else(|| {
            format!("{full_name} is not in the local cache. Run `gitdeck repos` first.")
        })?;

    let remote = app.remote().await?;
    let sync = app.star_sync(Arc::clone(&remote));
    let dispatch = match action {
        StarAction::Star => sync.star(row.id).await,
        StarAction::Unstar => sync.unstar(row.id).await,
    }
    .map_err(report)?;
    tracing::debug!(
        repo = full_name,
        ?action,
        count = dispatch.optimistic().stargazers_count,
        "Star change applied locally"
    );

    if dispatch.outcome().await.map_err(report)? == StarOutcome::RetryScheduled {
        if app.is_tty {
            eprintln!("Network unavailable, retrying in the background (Ctrl+C to stop)...");
        } else {
            tracing::warn!(repo = full_name, "Network unavailable, retrying");
        }
        let work = app.session.work();
        tokio::select! {
            _ = work.wait_idle() => {}
            _ = tokio::signal::ctrl_c() => {
                work.shutdown().await;
                return Err("Interrupted; the change is kept locally but was not sent.".into());
            }
        }

        if app.session.tokens().access_token().await?.is_none() {
            return Err(report(SyncError::SessionExpired));
        }
        let remote_state = StarState::from(
            remote
                .check_starred(owner, name)
                .await
                .map_err(|e| report(e.into()))?,
        );
        if remote_state != action.target() {
            return Err(format!(
                "{full_name}: the change could not be sent; it is kept locally only."
            )
            .into());
        }
    }

    let snapshot = app
        .cache
        .snapshot(row.id)
        .await?
        .ok_or_else(|| format!("{full_name} disappeared from the local cache"))?;
    let marker = star_marker(snapshot.is_starred);
    if app.is_tty {
        println!(
            "{} {} ({} stars)",
            style(marker).yellow(),
            style(full_name).cyan(),
            snapshot.stargazers_count
        );
    } else {
        println!("{marker} {full_name} ({} stars)", snapshot.stargazers_count);
    }
    Ok(())
}
