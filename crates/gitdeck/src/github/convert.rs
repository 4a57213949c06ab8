//! Conversion from GitHub payloads to remote model types.

use super::types::GitHubRepo;
use crate::remote::{Owner, RepoDetail, RepoSummary};

/// Convert a GitHub repository to a feed entry.
pub fn to_summary(repo: &GitHubRepo) -> RepoSummary {
    RepoSummary {
        id: repo.id,
        name: repo.name.clone(),
        owner: Owner {
            login: repo.owner.login.clone(),
            avatar_url: repo.owner.avatar_url.clone(),
        },
        description: repo.description.clone(),
        language: repo.language.clone(),
        stargazers_count: repo.stargazers_count,
        forks_count: repo.forks_count,
        default_branch: repo
            .default_branch
            .clone()
            .unwrap_or_else(|| "main".to_string()),
        updated_at: repo.updated_at.clone().unwrap_or_default(),
    }
}

/// Convert a GitHub repository to a detail view.
pub fn to_detail(repo: &GitHubRepo) -> RepoDetail {
    let summary = to_summary(repo);
    RepoDetail {
        html_url: repo
            .html_url
            .clone()
            .unwrap_or_else(|| format!("https://github.com/{}", summary.full_name())),
        homepage: repo.homepage.clone().filter(|h| !h.is_empty()),
        topics: repo.topics.clone(),
        open_issues_count: repo.open_issues_count,
        subscribers_count: repo.subscribers_count,
        is_fork: repo.fork,
        is_archived: repo.archived,
        repo: summary,
    }
}
