//! GitHub REST implementation of [`crate::remote::RemoteSource`].
//!
//! - [`client`] - Client creation and the remote operations
//! - [`types`] - Wire payloads
//! - [`convert`] - Payload conversion to remote model types
//! - [`error`] - Status and transport error classification
//!
//! ```ignore
//! use gitdeck::github::GitHubClient;
//! use gitdeck::remote::RemoteSource;
//!
//! let client = GitHubClient::new(&token)?;
//! let page = client.fetch_page("octocat", 30, 1).await?;
//! ```

mod client;
mod convert;
mod error;
mod types;

pub use client::{DEFAULT_API_URL, GitHubClient};
pub use convert::{to_detail, to_summary};
pub use types::{GitHubOwner, GitHubRepo};
