//! State shared by every command: cache, session and GitHub access.

use std::error::Error;
use std::sync::Arc;

use console::{Term, style};
use gitdeck::cache::LocalCache;
use gitdeck::github::GitHubClient;
use gitdeck::oauth::fresh_access_token;
use gitdeck::session::{FileTokenStore, Session, TokenStore};
use gitdeck::star::{Dismissal, StarSync, SyncError};
use gitdeck::work::BackoffWorkManager;
use gitdeck::{RepositoryModel, StarState};

use crate::config::Config;

pub(crate) type CliResult<T = ()> = Result<T, Box<dyn Error>>;

/// Open cache and restored session.
pub(crate) struct App {
    pub(crate) config: Config,
    pub(crate) cache: LocalCache,
    pub(crate) session: Session,
    pub(crate) http: reqwest::Client,
    pub(crate) is_tty: bool,
}

impl App {
    pub(crate) async fn open(config: Config, database_url: &str) -> CliResult<Self> {
        let db = gitdeck::connect_and_migrate(database_url).await?;
        let token_path = config
            .token_path()
            .ok_or("Could not determine the state directory for the token file")?;
        let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(token_path));
        let session = Session::restore(tokens, BackoffWorkManager::new()).await?;

        Ok(Self {
            config,
            cache: LocalCache::new(db),
            session,
            http: reqwest::Client::new(),
            is_tty: Term::stdout().is_term(),
        })
    }

    /// Authenticated GitHub client, refreshing the access token if needed.
    pub(crate) async fn remote(&self) -> CliResult<Arc<GitHubClient>> {
        let token = match self.config.oauth_config() {
            Some(oauth) => fresh_access_token(&self.session, &self.http, &oauth).await?,
            None => self.session.tokens().access_token().await?,
        };
        let token = token.ok_or("Not logged in. Run `gitdeck login` first.")?;
        let client = GitHubClient::with_base_url(&token, &self.config.github.api_url)?;
        Ok(Arc::new(client))
    }

    pub(crate) fn star_sync(&self, remote: Arc<GitHubClient>) -> StarSync<GitHubClient> {
        StarSync::new(
            remote,
            self.cache.clone(),
            self.session.clone(),
            self.config.retry.policy(),
        )
    }
}

/// Split `owner/name`.
pub(crate) fn parse_full_name(full_name: &str) -> CliResult<(&str, &str)> {
    match full_name.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => Err(format!("Expected OWNER/NAME, got '{full_name}'").into()),
    }
}

pub(crate) fn star_marker(state: StarState) -> &'static str {
    match state {
        StarState::Starred => "★",
        StarState::NotStarred => "☆",
        StarState::Unknown => "?",
    }
}

/// One list line: star marker, count, name, language and description.
pub(crate) fn format_row(row: &RepositoryModel, is_tty: bool) -> String {
    let marker = star_marker(row.is_starred);
    let name = row.full_name();
    let language = row.language.as_deref().unwrap_or("-");
    let description = row.description.as_deref().unwrap_or("");
    if is_tty {
        format!(
            "{} {:>6}  {:<40} {:<12} {}",
            style(marker).yellow(),
            row.stargazers_count,
            style(name).cyan(),
            style(language).dim(),
            description
        )
    } else {
        format!(
            "{marker} {:>6}  {name:<40} {language:<12} {description}",
            row.stargazers_count
        )
    }
}

/// Turn a star engine error into a CLI error, with a login hint when needed.
pub(crate) fn report(err: SyncError) -> Box<dyn Error> {
    tracing::debug!(error = %err, "Star engine error");
    match err.dismissal() {
        Dismissal::Relogin => format!("{} Run `gitdeck login`.", err.user_message()).into(),
        Dismissal::Close => err.user_message().into(),
    }
}
