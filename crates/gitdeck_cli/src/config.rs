//! Configuration file support for gitdeck.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (`GITDECK_<SECTION>__<KEY>`, e.g.
//!    `GITDECK_GITHUB__CLIENT_ID`)
//! 3. Config file (./gitdeck.toml, then ~/.config/gitdeck/config.toml)
//! 4. Built-in defaults
//!
//! The database defaults to `sqlite://~/.local/state/gitdeck/gitdeck.db` on
//! Linux (using the XDG state directory); the OAuth token is stored next to
//! it as `token.json`.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite:///home/me/gitdeck.db?mode=rwc"  # optional, this is the default
//!
//! [github]
//! client_id = "Iv1.0123456789abcdef"
//! client_secret = "..."      # or use GITDECK_GITHUB__CLIENT_SECRET
//! api_url = "https://api.github.com"
//! user = "octocat"           # whose repositories `gitdeck repos` lists
//!
//! [oauth]
//! callback_port = 18484
//! scope = "public_repo"
//!
//! [paging]
//! page_size = 30
//!
//! [retry]
//! max_attempts = 5
//! initial_delay_ms = 1000
//! max_delay_ms = 60000
//! factor = 2.0
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use gitdeck::github::DEFAULT_API_URL;
use gitdeck::oauth::{DEFAULT_CALLBACK_PORT, DEFAULT_OAUTH_URL, DEFAULT_SCOPE, OAuthConfig};
use gitdeck::paging::DEFAULT_PAGE_SIZE;
use gitdeck::work::{
    DEFAULT_FACTOR, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY_MS,
    RetryPolicy,
};
use serde::Deserialize;

const APP_NAME: &str = "gitdeck";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub github: GitHubConfig,
    pub oauth: OAuthSettings,
    pub paging: PagingConfig,
    pub retry: RetryConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection URL; defaults to the state directory.
    pub url: Option<String>,
}

/// GitHub configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// OAuth app client ID.
    pub client_id: Option<String>,
    /// OAuth app client secret.
    pub client_secret: Option<String>,
    /// REST API base URL.
    pub api_url: String,
    /// Host serving `/login/oauth/*`.
    pub oauth_url: String,
    /// Default user for `gitdeck repos`; the signed-in user when unset.
    pub user: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_url: DEFAULT_API_URL.to_string(),
            oauth_url: DEFAULT_OAUTH_URL.to_string(),
            user: None,
        }
    }
}

/// OAuth login settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OAuthSettings {
    /// Loopback port receiving the redirect.
    pub callback_port: u16,
    pub scope: String,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            callback_port: DEFAULT_CALLBACK_PORT,
            scope: DEFAULT_SCOPE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    pub page_size: u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Backoff schedule for failed star changes.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub factor: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            factor: DEFAULT_FACTOR,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts.max(1),
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms.max(self.initial_delay_ms)),
            self.factor,
        )
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/gitdeck/config.toml)
    /// 3. Local config file (./gitdeck.toml)
    /// 4. Environment variables with the `GITDECK_` prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("gitdeck.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./gitdeck.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // GITDECK_GITHUB__CLIENT_ID -> github.client_id
        builder = builder.add_source(
            Environment::with_prefix("GITDECK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        match Self::from_builder(builder) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}", e);
                Config::default()
            }
        }
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// `mode=rwc` creates the file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("gitdeck.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    /// Where the OAuth token is stored.
    pub fn token_path(&self) -> Option<PathBuf> {
        Self::default_state_dir().map(|dir| dir.join("token.json"))
    }

    /// OAuth app settings, if a client ID and secret are configured.
    pub fn oauth_config(&self) -> Option<OAuthConfig> {
        let client_id = self.github.client_id.as_deref()?;
        let client_secret = self.github.client_secret.as_deref()?;
        Some(
            OAuthConfig::new(client_id, client_secret)
                .with_scope(self.oauth.scope.clone())
                .with_base_url(self.github.oauth_url.clone()),
        )
    }

    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/gitdeck` or `~/.local/state/gitdeck`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}
