use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{oneshot, watch};

use crate::cache::{LocalCache, StarSnapshot, repos};
use crate::entity::star_state::StarState;
use crate::remote::{self, ErrorKind, RemoteError, RemoteSource, RepoDetail};
use crate::session::Session;
use crate::work::{CallOutcome, RetryPolicy};

use super::error::{Result, SyncError};

/// Work manager key for the retry of one repository's star intent.
pub fn retry_key(id: i64) -> String {
    format!("star_{id}")
}

/// The two user intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarAction {
    Star,
    Unstar,
}

impl StarAction {
    pub fn target(self) -> StarState {
        match self {
            Self::Star => StarState::Starred,
            Self::Unstar => StarState::NotStarred,
        }
    }

    /// Optimistic snapshot after applying this action to `current`.
    ///
    /// A row already in the target state keeps its count.
    fn apply(self, current: StarSnapshot) -> StarSnapshot {
        let count = current.stargazers_count;
        let stargazers_count = if current.is_starred == self.target() {
            count
        } else {
            match self {
                Self::Star => count.saturating_add(1),
                Self::Unstar => count.saturating_sub(1).max(0),
            }
        };
        StarSnapshot {
            is_starred: self.target(),
            stargazers_count,
        }
    }

    async fn send<R: RemoteSource + ?Sized>(
        self,
        remote: &R,
        owner: &str,
        name: &str,
    ) -> remote::Result<()> {
        match self {
            Self::Star => remote.star(owner, name).await,
            Self::Unstar => remote.unstar(owner, name).await,
        }
    }
}

/// How a dispatched star or unstar settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarOutcome {
    /// The remote accepted the change.
    Confirmed,
    /// The remote was unreachable; a backoff retry is pending.
    RetryScheduled,
    /// A newer intent for the same repository took over.
    Superseded,
}

/// Handle to a star or unstar whose optimistic write is already applied.
#[derive(Debug)]
pub struct StarDispatch {
    id: i64,
    action: StarAction,
    optimistic: StarSnapshot,
    rx: oneshot::Receiver<Result<StarOutcome>>,
}

impl StarDispatch {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn action(&self) -> StarAction {
        self.action
    }

    /// What the cache was set to before the remote call.
    pub fn optimistic(&self) -> StarSnapshot {
        self.optimistic
    }

    /// Wait for the first remote attempt to settle.
    pub async fn outcome(self) -> Result<StarOutcome> {
        self.rx.await.unwrap_or(Err(SyncError::Interrupted))
    }
}

#[derive(Debug, Clone)]
struct Target {
    id: i64,
    owner: String,
    name: String,
}

impl Target {
    fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

struct Inner<R> {
    remote: Arc<R>,
    cache: LocalCache,
    session: Session,
    policy: RetryPolicy,
    /// Serializes read-modify-write of star fields.
    write_lock: tokio::sync::Mutex<()>,
    /// Latest intent generation per repository.
    intents: Mutex<HashMap<i64, u64>>,
    next_intent: AtomicU64,
}

/// Star synchronization engine.
///
/// Cheap to clone; clones share state.
pub struct StarSync<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for StarSync<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: RemoteSource + 'static> StarSync<R> {
    pub fn new(remote: Arc<R>, cache: LocalCache, session: Session, policy: RetryPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                remote,
                cache,
                session,
                policy,
                write_lock: tokio::sync::Mutex::new(()),
                intents: Mutex::new(HashMap::new()),
                next_intent: AtomicU64::new(0),
            }),
        }
    }

    pub fn cache(&self) -> &LocalCache {
        &self.inner.cache
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Latest star snapshot of `id`, then every change.
    pub async fn watch(&self, id: i64) -> Result<watch::Receiver<Option<StarSnapshot>>> {
        Ok(self.inner.cache.subscribe(id).await?)
    }

    /// Mark starred with `stargazers_count`, in one statement.
    pub async fn star_local(&self, id: i64, stargazers_count: i32) -> Result<()> {
        let _guard = self.inner.write_lock.lock().await;
        Ok(self.inner.cache.star_local(id, stargazers_count).await?)
    }

    /// Mark not starred with `stargazers_count`, in one statement.
    pub async fn unstar_local(&self, id: i64, stargazers_count: i32) -> Result<()> {
        let _guard = self.inner.write_lock.lock().await;
        Ok(self.inner.cache.unstar_local(id, stargazers_count).await?)
    }

    /// Resolve an unknown star state against the remote.
    ///
    /// Known states are returned without a network call. Failures leave the
    /// state unknown and are not retried here.
    pub async fn reconcile(&self, id: i64) -> Result<StarState> {
        let db = self.inner.cache.db();
        let row = repos::find_by_id(db, id)
            .await?
            .ok_or(SyncError::NotCached(id))?;
        if row.is_starred.is_known() {
            return Ok(row.is_starred);
        }

        let check = match self
            .inner
            .remote
            .check_starred(&row.owner_login, &row.name)
            .await
        {
            Ok(check) => check,
            Err(e) => return Err(self.classify_read_error(e, row.full_name()).await),
        };
        let state = StarState::from(check);

        let _guard = self.inner.write_lock.lock().await;
        // A star or unstar issued while the check was in flight wins.
        let current = repos::star_snapshot(db, id)
            .await?
            .ok_or(SyncError::NotCached(id))?;
        if current.is_starred.is_known() {
            return Ok(current.is_starred);
        }
        self.inner.cache.set_star_state(id, state).await?;
        tracing::debug!(id, %state, "Reconciled star state");
        Ok(state)
    }

    pub async fn star(&self, id: i64) -> Result<StarDispatch> {
        self.dispatch(id, StarAction::Star).await
    }

    pub async fn unstar(&self, id: i64) -> Result<StarDispatch> {
        self.dispatch(id, StarAction::Unstar).await
    }

    /// Fetch a repository for display and store its authoritative count.
    pub async fn load_detail(&self, owner: &str, name: &str) -> Result<RepoDetail> {
        let detail = match self.inner.remote.fetch_detail(owner, name).await {
            Ok(detail) => detail,
            Err(e) => {
                return Err(self
                    .classify_read_error(e, format!("{owner}/{name}"))
                    .await);
            }
        };

        let id = detail.repo.id;
        let count = i32::try_from(detail.repo.stargazers_count).unwrap_or(i32::MAX);
        let _guard = self.inner.write_lock.lock().await;
        if repos::find_by_id(self.inner.cache.db(), id).await?.is_some() {
            self.inner.cache.set_stargazers_count(id, count).await?;
            tracing::debug!(id, count, "Stored authoritative star count");
        }
        Ok(detail)
    }

    async fn dispatch(&self, id: i64, action: StarAction) -> Result<StarDispatch> {
        let (target, prior, optimistic, generation) = {
            let _guard = self.inner.write_lock.lock().await;
            let row = repos::find_by_id(self.inner.cache.db(), id)
                .await?
                .ok_or(SyncError::NotCached(id))?;
            let prior = StarSnapshot::from(&row);
            let optimistic = action.apply(prior);
            self.inner
                .cache
                .set_star(id, optimistic.is_starred, optimistic.stargazers_count)
                .await?;
            let generation = self.begin_intent(id);
            let target = Target {
                id,
                owner: row.owner_login,
                name: row.name,
            };
            (target, prior, optimistic, generation)
        };
        tracing::debug!(id, ?action, generation, "Applied optimistic star change");

        let (tx, rx) = oneshot::channel();
        let this = self.clone();
        tokio::spawn(async move {
            let outcome = this.complete(target, action, prior, generation).await;
            let _ = tx.send(outcome);
        });

        Ok(StarDispatch {
            id,
            action,
            optimistic,
            rx,
        })
    }

    async fn complete(
        &self,
        target: Target,
        action: StarAction,
        prior: StarSnapshot,
        generation: u64,
    ) -> Result<StarOutcome> {
        let err = match action
            .send(&*self.inner.remote, &target.owner, &target.name)
            .await
        {
            Ok(()) => {
                tracing::debug!(id = target.id, ?action, "Star change confirmed");
                return Ok(StarOutcome::Confirmed);
            }
            Err(e) => e,
        };

        match err.kind() {
            ErrorKind::Network => {
                if self.schedule_retry(target, action, prior, generation) {
                    Ok(StarOutcome::RetryScheduled)
                } else {
                    Ok(StarOutcome::Superseded)
                }
            }
            ErrorKind::NotFound => {
                self.rollback(target.id, prior, generation).await?;
                Err(SyncError::InvalidRepository {
                    full_name: target.full_name(),
                })
            }
            ErrorKind::Unauthorized => {
                self.expire_session().await;
                Err(SyncError::SessionExpired)
            }
            ErrorKind::Other => Err(SyncError::Remote(err)),
        }
    }

    /// Register a backoff retry, unless a newer intent exists.
    fn schedule_retry(
        &self,
        target: Target,
        action: StarAction,
        prior: StarSnapshot,
        generation: u64,
    ) -> bool {
        let intents = self.intents();
        if intents.get(&target.id) != Some(&generation) {
            return false;
        }

        let key = retry_key(target.id);
        tracing::debug!(key = %key, ?action, "Scheduling star retry");
        let this = self.clone();
        self.inner
            .session
            .work()
            .add_retry(key, self.inner.policy, move || {
                let this = this.clone();
                let target = target.clone();
                async move { this.retry_attempt(&target, action, prior, generation).await }
            });
        true
    }

    async fn retry_attempt(
        &self,
        target: &Target,
        action: StarAction,
        prior: StarSnapshot,
        generation: u64,
    ) -> CallOutcome<RemoteError> {
        if !self.is_latest(target.id, generation) {
            tracing::debug!(id = target.id, "Dropping superseded star retry");
            return CallOutcome::Success;
        }

        let err = match action
            .send(&*self.inner.remote, &target.owner, &target.name)
            .await
        {
            Ok(()) => {
                tracing::debug!(id = target.id, ?action, "Star change confirmed on retry");
                return CallOutcome::Success;
            }
            Err(e) => e,
        };

        match err.kind() {
            ErrorKind::Network => CallOutcome::Transient(err),
            ErrorKind::NotFound => {
                if let Err(e) = self.rollback(target.id, prior, generation).await {
                    tracing::warn!(id = target.id, error = %e, "Rollback failed");
                }
                CallOutcome::Permanent(err)
            }
            ErrorKind::Unauthorized => {
                self.expire_session().await;
                CallOutcome::Permanent(err)
            }
            ErrorKind::Other => CallOutcome::Permanent(err),
        }
    }

    /// Restore the pre-intent snapshot if the intent is still the latest.
    async fn rollback(&self, id: i64, prior: StarSnapshot, generation: u64) -> Result<()> {
        let _guard = self.inner.write_lock.lock().await;
        if !self.is_latest(id, generation) {
            return Ok(());
        }
        tracing::warn!(id, "Repository not found, rolling back star change");
        self.inner
            .cache
            .set_star(id, prior.is_starred, prior.stargazers_count)
            .await?;
        Ok(())
    }

    async fn classify_read_error(&self, err: RemoteError, full_name: String) -> SyncError {
        match err.kind() {
            ErrorKind::Unauthorized => {
                self.expire_session().await;
                SyncError::SessionExpired
            }
            ErrorKind::NotFound => SyncError::InvalidRepository { full_name },
            ErrorKind::Network | ErrorKind::Other => SyncError::Remote(err),
        }
    }

    async fn expire_session(&self) {
        tracing::warn!("Credentials rejected, logging out");
        if let Err(e) = self.inner.session.logout().await {
            tracing::warn!(error = %e, "Failed to clear stored token");
        }
    }

    /// Record a new intent for `id` and cancel any retry of an older one.
    fn begin_intent(&self, id: i64) -> u64 {
        let generation = self.inner.next_intent.fetch_add(1, Ordering::SeqCst) + 1;
        let mut intents = self.intents();
        intents.insert(id, generation);
        self.inner.session.work().cancel(&retry_key(id));
        generation
    }

    fn is_latest(&self, id: i64, generation: u64) -> bool {
        self.intents().get(&id) == Some(&generation)
    }

    fn intents(&self) -> MutexGuard<'_, HashMap<i64, u64>> {
        self.inner
            .intents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
