//! gitdeck CLI - browse and star GitHub repositories from the terminal.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use console::Term;
use gitdeck::star::StarAction;
use tracing_subscriber::EnvFilter;

use crate::commands::repos::ReposArgs;
use crate::commands::shared::App;

#[derive(Parser)]
#[command(name = "gitdeck")]
#[command(version)]
#[command(about = "Browse and star GitHub repositories")]
#[command(
    long_about = "gitdeck keeps a local cache of a user's GitHub repositories, pages through \
them on demand and stars or unstars them. Star changes show up immediately and are retried \
with exponential backoff while the network is unavailable."
)]
#[command(after_long_help = r#"EXAMPLES
    Sign in through the browser:
        $ gitdeck login

    List the first two pages of a user's repositories:
        $ gitdeck repos --user octocat --pages 2

    Star a repository from the list:
        $ gitdeck star octocat/Hello-World

CONFIGURATION
    gitdeck reads configuration from:
      1. ~/.config/gitdeck/config.toml (or $XDG_CONFIG_HOME/gitdeck/config.toml)
      2. ./gitdeck.toml
      3. Environment variables (GITDECK_<SECTION>__<KEY>)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    GITDECK_DATABASE__URL          Database connection string (default: ~/.local/state/gitdeck/gitdeck.db)
    GITDECK_GITHUB__CLIENT_ID      OAuth app client ID
    GITDECK_GITHUB__CLIENT_SECRET  OAuth app client secret
    GITDECK_GITHUB__USER           Default user for `gitdeck repos`
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate with GitHub through the browser
    Login,
    /// Forget the stored token and cancel pending retries
    Logout,
    /// List repositories, loading more pages into the local cache
    Repos {
        /// Whose repositories to list (default from config, else the signed-in user)
        #[arg(short, long)]
        user: Option<String>,

        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: u32,

        /// Drop the cache and start again from the first page
        #[arg(short, long)]
        refresh: bool,
    },
    /// Star a repository (OWNER/NAME)
    Star { repo: String },
    /// Unstar a repository (OWNER/NAME)
    Unstar { repo: String },
    /// Show repository details (OWNER/NAME)
    Show { repo: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Structured logging only when not attached to a terminal
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("gitdeck=info,gitdeck_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config = config::Config::load();
    let cli = Cli::parse();

    let database_url = config
        .database_url()
        .ok_or("Could not determine the database location; set database.url")?;

    // Ensure the database directory exists for SQLite
    if database_url.starts_with("sqlite://") {
        let db_path = database_url.trim_start_matches("sqlite://");
        let db_path = db_path.split('?').next().unwrap_or(db_path);
        let db_path = std::path::Path::new(db_path);

        if db_path.is_relative() && !db_path.as_os_str().is_empty() {
            tracing::warn!(
                "Database path '{}' is relative - behavior depends on current directory.",
                db_path.display()
            );
        }

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
    }

    let app = App::open(config, &database_url).await?;

    match cli.command {
        Commands::Login => commands::login::handle_login(&app).await?,
        Commands::Logout => commands::login::handle_logout(&app).await?,
        Commands::Repos {
            user,
            pages,
            refresh,
        } => {
            commands::repos::handle_repos(
                &app,
                ReposArgs {
                    user,
                    pages,
                    refresh,
                },
            )
            .await?
        }
        Commands::Star { repo } => {
            commands::star::handle_star(&app, &repo, StarAction::Star).await?
        }
        Commands::Unstar { repo } => {
            commands::star::handle_star(&app, &repo, StarAction::Unstar).await?
        }
        Commands::Show { repo } => commands::show::handle_show(&app, &repo).await?,
    }

    Ok(())
}
