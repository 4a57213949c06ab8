//! gitdeck - Browse a user's repositories with an offline cache and
//! optimistic starring.
//!
//! The library is split into a local cache over SQLite ([`cache`]), a
//! remote source abstraction ([`remote`]) with a GitHub implementation
//! ([`github`]), a paging mediator that fills the cache ([`paging`]) and the
//! star synchronization engine ([`star`]) that applies star changes locally
//! first and retries failed remote calls with exponential backoff ([`work`]).
//!
//! # Features
//!
//! - `github` - GitHub REST client and OAuth code exchange.
//! - `migrate` - Enables database migration support. When enabled, you can use
//!   [`connect_and_migrate`] to create the schema on connection.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gitdeck::{connect_and_migrate, cache::LocalCache, github::GitHubClient};
//! use gitdeck::paging::{LoadType, PagingState, RepoMediator};
//! use gitdeck::star::StarSync;
//! use gitdeck::work::RetryPolicy;
//!
//! let db = connect_and_migrate("sqlite://gitdeck.db?mode=rwc").await?;
//! let cache = LocalCache::new(db);
//! let remote = Arc::new(GitHubClient::new(&token)?);
//!
//! let mediator = RepoMediator::new(Arc::clone(&remote), cache.clone(), "octocat");
//! mediator.load(LoadType::Refresh, &PagingState::new(30)).await?;
//!
//! let sync = StarSync::new(remote, cache, session, RetryPolicy::default());
//! let outcome = sync.star(1296269).await?.outcome().await?;
//! ```

pub mod cache;
pub mod db;
pub mod entity;
pub mod paging;
pub mod remote;
pub mod session;
pub mod star;
pub mod work;

#[cfg(feature = "github")]
pub mod github;

#[cfg(feature = "github")]
pub mod oauth;

#[cfg(feature = "migrate")]
pub mod migration;

#[cfg(test)]
mod test_support;

pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
