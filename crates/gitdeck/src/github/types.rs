//! GitHub REST payloads.
//!
//! Only the fields the browser shows are declared; GitHub sends many more.

use serde::{Deserialize, Serialize};

/// Query for `GET /users/{user}/repos`.
#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct PageParams {
    pub per_page: u32,
    pub page: u32,
}

/// Owner object embedded in a repository.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubOwner {
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
}

/// Repository object as returned by the list and single-repository endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRepo {
    pub id: i64,
    pub name: String,
    pub owner: GitHubOwner,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub open_issues_count: u32,
    /// Only present on the single-repository endpoint.
    #[serde(default)]
    pub subscribers_count: Option<u32>,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub archived: bool,
}
