//! Shared fixtures for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sea_orm::Set;
use tokio::sync::Notify;

use crate::entity::repository::ActiveModel;
use crate::entity::star_state::StarState;
use crate::remote::{
    Owner, RemoteError, RemoteSource, RepoDetail, RepoSummary, Result as RemoteResult, StarCheck,
};

/// A cached row owned by `octocat` with ten stars and an unknown star state.
pub(crate) fn active_model(id: i64, name: &str, sort_index: i64) -> ActiveModel {
    ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        owner_login: Set("octocat".to_string()),
        owner_avatar_url: Set("https://avatars.example/octocat".to_string()),
        description: Set(None),
        language: Set(Some("Rust".to_string())),
        default_branch: Set("main".to_string()),
        updated_at: Set("2026-01-01T00:00:00Z".to_string()),
        stargazers_count: Set(10),
        forks_count: Set(2),
        is_starred: Set(StarState::Unknown),
        sort_index: Set(sort_index),
    }
}

/// Build a feed entry owned by `octocat` with ten stars.
pub(crate) fn summary(id: i64, name: &str) -> RepoSummary {
    RepoSummary {
        id,
        name: name.to_string(),
        owner: Owner {
            login: "octocat".to_string(),
            avatar_url: "https://avatars.example/octocat".to_string(),
        },
        description: None,
        language: Some("Rust".to_string()),
        stargazers_count: 10,
        forks_count: 2,
        default_branch: "main".to_string(),
        updated_at: "2026-01-01T00:00:00Z".to_string(),
    }
}

/// Feed entries with IDs `1..=count`, named `repo-<id>`.
pub(crate) fn catalogue(count: i64) -> Vec<RepoSummary> {
    (1..=count).map(|id| summary(id, &format!("repo-{id}"))).collect()
}

/// A remote call recorded by [`TestRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    FetchPage(u32),
    Detail(String),
    Check(String),
    Star(String),
    Unstar(String),
}

/// Scriptable in-memory remote.
///
/// Pages are sliced out of a catalogue. Star, unstar and check results are
/// popped from per-operation queues and default to success / not starred.
#[derive(Clone, Default)]
pub(crate) struct TestRemote {
    catalogue: Arc<Mutex<Vec<RepoSummary>>>,
    page_error: Arc<Mutex<Option<RemoteError>>>,
    detail_counts: Arc<Mutex<HashMap<String, u32>>>,
    check_results: Arc<Mutex<VecDeque<RemoteResult<StarCheck>>>>,
    star_results: Arc<Mutex<VecDeque<RemoteResult<()>>>>,
    unstar_results: Arc<Mutex<VecDeque<RemoteResult<()>>>>,
    star_gate: Arc<Mutex<Option<Arc<Notify>>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl TestRemote {
    pub(crate) fn with_catalogue(repos: Vec<RepoSummary>) -> Self {
        let remote = Self::default();
        *lock(&remote.catalogue) = repos;
        remote
    }

    pub(crate) fn fail_pages(&self, error: Option<RemoteError>) {
        *lock(&self.page_error) = error;
    }

    pub(crate) fn set_detail_count(&self, full_name: &str, count: u32) {
        lock(&self.detail_counts).insert(full_name.to_string(), count);
    }

    pub(crate) fn push_check(&self, result: RemoteResult<StarCheck>) {
        lock(&self.check_results).push_back(result);
    }

    pub(crate) fn push_star(&self, result: RemoteResult<()>) {
        lock(&self.star_results).push_back(result);
    }

    pub(crate) fn push_unstar(&self, result: RemoteResult<()>) {
        lock(&self.unstar_results).push_back(result);
    }

    /// Make the next `star` calls wait until the returned notify fires.
    pub(crate) fn gate_star(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *lock(&self.star_gate) = Some(Arc::clone(&gate));
        gate
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: Call) {
        lock(&self.calls).push(call);
    }

    fn find(&self, owner: &str, name: &str) -> Option<RepoSummary> {
        lock(&self.catalogue)
            .iter()
            .find(|r| r.owner.login == owner && r.name == name)
            .cloned()
    }
}

#[async_trait]
impl RemoteSource for TestRemote {
    async fn fetch_page(
        &self,
        _user: &str,
        page_size: u32,
        page: u32,
    ) -> RemoteResult<Vec<RepoSummary>> {
        self.record(Call::FetchPage(page));
        if let Some(e) = lock(&self.page_error).clone() {
            return Err(e);
        }
        let start = (page.saturating_sub(1) * page_size) as usize;
        Ok(lock(&self.catalogue)
            .iter()
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .collect())
    }

    async fn fetch_detail(&self, owner: &str, name: &str) -> RemoteResult<RepoDetail> {
        let full_name = format!("{owner}/{name}");
        self.record(Call::Detail(full_name.clone()));
        let mut repo = self
            .find(owner, name)
            .ok_or_else(|| RemoteError::not_found(full_name.clone()))?;
        if let Some(count) = lock(&self.detail_counts).get(&full_name) {
            repo.stargazers_count = *count;
        }
        Ok(RepoDetail {
            html_url: format!("https://github.example/{full_name}"),
            repo,
            homepage: None,
            topics: vec!["cli".to_string()],
            open_issues_count: 3,
            subscribers_count: Some(4),
            is_fork: false,
            is_archived: false,
        })
    }

    async fn check_starred(&self, owner: &str, name: &str) -> RemoteResult<StarCheck> {
        self.record(Call::Check(format!("{owner}/{name}")));
        lock(&self.check_results)
            .pop_front()
            .unwrap_or(Ok(StarCheck::NotStarred))
    }

    async fn star(&self, owner: &str, name: &str) -> RemoteResult<()> {
        self.record(Call::Star(format!("{owner}/{name}")));
        let gate = lock(&self.star_gate).take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        lock(&self.star_results).pop_front().unwrap_or(Ok(()))
    }

    async fn unstar(&self, owner: &str, name: &str) -> RemoteResult<()> {
        self.record(Call::Unstar(format!("{owner}/{name}")));
        lock(&self.unstar_results).pop_front().unwrap_or(Ok(()))
    }
}
