use async_trait::async_trait;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use crate::entity::repository::ActiveModel as RepositoryActiveModel;
use crate::entity::star_state::StarState;

use super::errors::Result;

/// Owner of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
    pub avatar_url: String,
}

/// A repository as listed in a page of the remote feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSummary {
    /// Remote-assigned numeric ID.
    pub id: i64,
    pub name: String,
    pub owner: Owner,
    pub description: Option<String>,
    /// Primary programming language.
    pub language: Option<String>,
    pub stargazers_count: u32,
    pub forks_count: u32,
    pub default_branch: String,
    /// Opaque, display-only timestamp.
    pub updated_at: String,
}

impl RepoSummary {
    /// Get the full name (owner/name).
    #[inline]
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner.login, self.name)
    }

    /// Convert to a cache row at `sort_index`, with an unknown star state.
    pub fn to_active_model(&self, sort_index: i64) -> RepositoryActiveModel {
        RepositoryActiveModel {
            id: Set(self.id),
            name: Set(self.name.clone()),
            owner_login: Set(self.owner.login.clone()),
            owner_avatar_url: Set(self.owner.avatar_url.clone()),
            description: Set(self.description.clone()),
            language: Set(self.language.clone()),
            default_branch: Set(self.default_branch.clone()),
            updated_at: Set(self.updated_at.clone()),
            stargazers_count: Set(clamp_count(self.stargazers_count)),
            forks_count: Set(clamp_count(self.forks_count)),
            is_starred: Set(StarState::Unknown),
            sort_index: Set(sort_index),
        }
    }
}

#[inline]
pub(crate) fn clamp_count(count: u32) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

/// A single repository with the fields shown on a detail screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoDetail {
    pub repo: RepoSummary,
    /// Browser URL.
    pub html_url: String,
    pub homepage: Option<String>,
    pub topics: Vec<String>,
    pub open_issues_count: u32,
    /// Watchers (subscribers), when the remote reports them.
    pub subscribers_count: Option<u32>,
    pub is_fork: bool,
    pub is_archived: bool,
}

/// Result of asking whether the authenticated user starred a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarCheck {
    Starred,
    NotStarred,
}

impl From<StarCheck> for StarState {
    fn from(check: StarCheck) -> Self {
        StarState::from_starred(check == StarCheck::Starred)
    }
}

/// Remote source of truth for repositories and star state.
///
/// Implementations map transport failures to `RemoteError::Network`,
/// throttling to `RemoteError::RateLimited`, rejected credentials to `RemoteError::Unauthorized` and missing resources
/// to `RemoteError::NotFound`. `check_starred` reports "not starred" as
/// `StarCheck::NotStarred`, never as `NotFound`.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch one page (1-based) of a user's repositories.
    async fn fetch_page(&self, user: &str, page_size: u32, page: u32) -> Result<Vec<RepoSummary>>;

    /// Fetch a single repository by owner and name.
    async fn fetch_detail(&self, owner: &str, name: &str) -> Result<RepoDetail>;

    /// Check if a repository is starred by the authenticated user.
    async fn check_starred(&self, owner: &str, name: &str) -> Result<StarCheck>;

    /// Star a repository. Idempotent on the server.
    async fn star(&self, owner: &str, name: &str) -> Result<()>;

    /// Unstar a repository. Idempotent on the server.
    async fn unstar(&self, owner: &str, name: &str) -> Result<()>;
}
