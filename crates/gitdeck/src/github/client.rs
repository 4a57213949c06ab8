//! GitHub client implementing [`RemoteSource`].

use std::sync::Arc;

use async_trait::async_trait;
use octocrab::Octocrab;

use super::convert::{to_detail, to_summary};
use super::error::{ResponseHints, from_octocrab, from_status};
use super::types::{GitHubRepo, PageParams};
use crate::remote::{RemoteSource, RepoDetail, RepoSummary, Result, StarCheck};

/// Public GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// GitHub REST client.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct GitHubClient {
    inner: Arc<Octocrab>,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient").finish_non_exhaustive()
    }
}

impl GitHubClient {
    /// Create a client for api.github.com authenticated with `token`.
    pub fn new(token: &str) -> octocrab::Result<Self> {
        Self::with_base_url(token, DEFAULT_API_URL)
    }

    /// Create a client for a GitHub-compatible API at `base_url`.
    pub fn with_base_url(token: &str, base_url: &str) -> octocrab::Result<Self> {
        let client = Octocrab::builder()
            .base_uri(base_url)?
            .personal_token(token.to_string())
            .build()?;
        Ok(Self::from_octocrab(client))
    }

    pub fn from_octocrab(client: Octocrab) -> Self {
        Self {
            inner: Arc::new(client),
        }
    }

    /// Get a reference to the inner Octocrab client.
    pub fn inner(&self) -> &Octocrab {
        &self.inner
    }
}

fn repo_route(owner: &str, name: &str) -> String {
    format!(
        "{}/{}",
        urlencoding::encode(owner),
        urlencoding::encode(name)
    )
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

#[async_trait]
impl RemoteSource for GitHubClient {
    async fn fetch_page(&self, user: &str, page_size: u32, page: u32) -> Result<Vec<RepoSummary>> {
        // GET /users/{user}/repos?per_page=&page=
        let route = format!("/users/{}/repos", urlencoding::encode(user));
        let params = PageParams {
            per_page: page_size,
            page,
        };
        let repos: Vec<GitHubRepo> = self
            .inner
            .get(&route, Some(&params))
            .await
            .map_err(|e| from_octocrab(e, user))?;

        tracing::debug!(user, page, count = repos.len(), "Fetched repository page");
        Ok(repos.iter().map(to_summary).collect())
    }

    async fn fetch_detail(&self, owner: &str, name: &str) -> Result<RepoDetail> {
        let full_name = format!("{owner}/{name}");
        let route = format!("/repos/{}", repo_route(owner, name));
        let repo: GitHubRepo = self
            .inner
            .get(&route, None::<&()>)
            .await
            .map_err(|e| from_octocrab(e, &full_name))?;
        Ok(to_detail(&repo))
    }

    async fn check_starred(&self, owner: &str, name: &str) -> Result<StarCheck> {
        // 204 if starred, 404 if not. `_get` because the body is empty.
        let full_name = format!("{owner}/{name}");
        let route = format!("/user/starred/{}", repo_route(owner, name));
        let response = self
            .inner
            ._get(&route)
            .await
            .map_err(|e| from_octocrab(e, &full_name))?;

        match response.status().as_u16() {
            404 => Ok(StarCheck::NotStarred),
            status if is_success(status) => Ok(StarCheck::Starred),
            status => Err(from_status(
                status,
                ResponseHints::from_headers(response.headers()),
                &full_name,
            )),
        }
    }

    async fn star(&self, owner: &str, name: &str) -> Result<()> {
        // PUT /user/starred/{owner}/{repo}
        let full_name = format!("{owner}/{name}");
        let route = format!("/user/starred/{}", repo_route(owner, name));
        let response = self
            .inner
            ._put(&route, None::<&()>)
            .await
            .map_err(|e| from_octocrab(e, &full_name))?;

        match response.status().as_u16() {
            status if is_success(status) => Ok(()),
            status => Err(from_status(
                status,
                ResponseHints::from_headers(response.headers()),
                &full_name,
            )),
        }
    }

    async fn unstar(&self, owner: &str, name: &str) -> Result<()> {
        // DELETE /user/starred/{owner}/{repo}
        let full_name = format!("{owner}/{name}");
        let route = format!("/user/starred/{}", repo_route(owner, name));
        let response = self
            .inner
            ._delete(&route, None::<&()>)
            .await
            .map_err(|e| from_octocrab(e, &full_name))?;

        match response.status().as_u16() {
            status if is_success(status) => Ok(()),
            status => Err(from_status(
                status,
                ResponseHints::from_headers(response.headers()),
                &full_name,
            )),
        }
    }
}
