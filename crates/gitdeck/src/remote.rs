//! Remote repository source: the network side of the data layer.
//!
//! The [`RemoteSource`] trait is what the star engine and the page mediator
//! talk to. [`crate::github::GitHubClient`] implements it over the GitHub REST
//! API; tests use in-memory fakes.
//!
//! # Example
//!
//! ```ignore
//! use gitdeck::remote::{RemoteSource, StarCheck};
//!
//! async fn is_starred<R: RemoteSource>(remote: &R) -> gitdeck::remote::Result<bool> {
//!     Ok(remote.check_starred("rust-lang", "rust").await? == StarCheck::Starred)
//! }
//! ```

mod errors;
mod types;

pub use errors::{ErrorKind, RemoteError, Result};
pub use types::{Owner, RemoteSource, RepoDetail, RepoSummary, StarCheck};
