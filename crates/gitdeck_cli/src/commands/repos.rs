//! `gitdeck repos`: page through a user's repositories.

use gitdeck::cache::repos;
use gitdeck::paging::{LoadType, PagingState, RepoMediator};
use gitdeck::star::SyncError;
use gitdeck::StarState;

use super::shared::{App, CliResult, format_row, report};

pub(crate) struct ReposArgs {
    pub(crate) user: Option<String>,
    pub(crate) pages: u32,
    pub(crate) refresh: bool,
}

/// Load pages into the cache, resolve unknown star states and print the list.
pub(crate) async fn handle_repos(app: &App, args: ReposArgs) -> CliResult {
    let remote = app.remote().await?;
    let user = match args.user.or_else(|| app.config.github.user.clone()) {
        Some(user) => user,
        None => remote.inner().current().user().await?.login,
    };
    let db = app.cache.db();
    let page_size = app.config.paging.page_size;
    let mediator = RepoMediator::new(remote.clone(), app.cache.clone(), user);

    let mut remaining = args.pages.max(1);
    if args.refresh || mediator.needs_refresh().await? {
        mediator
            .load(LoadType::Refresh, &PagingState::new(page_size))
            .await?;
        remaining -= 1;
    }
    while remaining > 0 {
        let state = PagingState::from_cache(db, page_size, None).await?;
        let outcome = mediator.load(LoadType::Append, &state).await?;
        remaining -= 1;
        if outcome.end_of_pagination_reached {
            tracing::debug!(user = mediator.user(), "Reached the last page");
            break;
        }
    }

    let total = repos::count(db).await?;
    let rows = repos::page(db, 0, total).await?;
    let sync = app.star_sync(remote);
    for row in rows.iter().filter(|r| r.is_starred == StarState::Unknown) {
        match sync.reconcile(row.id).await {
            Ok(_) => {}
            Err(err @ SyncError::SessionExpired) => return Err(report(err)),
            Err(err) => {
                tracing::warn!(repo = %row.full_name(), error = %err, "Could not resolve star state");
            }
        }
    }

    for row in repos::page(db, 0, total).await? {
        println!("{}", format_row(&row, app.is_tty));
    }
    Ok(())
}
