use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sea_orm::DatabaseConnection;
use serde::Serialize;
use tokio::sync::watch;

use crate::entity::repository::Model;
use crate::entity::star_state::StarState;

use super::errors::{CacheError, Result};
use super::repos;

/// Star fields of one repository, as seen by observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StarSnapshot {
    pub is_starred: StarState,
    pub stargazers_count: i32,
}

impl From<&Model> for StarSnapshot {
    fn from(model: &Model) -> Self {
        Self {
            is_starred: model.is_starred,
            stargazers_count: model.stargazers_count,
        }
    }
}

type Watchers = HashMap<i64, watch::Sender<Option<StarSnapshot>>>;

/// Connection handle that publishes star changes to subscribers.
///
/// Cheap to clone; clones share the connection and the subscriber registry.
/// `None` is published for IDs that are not (or no longer) cached.
///
/// Row writes made through this handle and every read-then-send of a
/// snapshot hold one async lock, so a slow publish can never overwrite a
/// newer value with an older one.
#[derive(Clone)]
pub struct LocalCache {
    db: Arc<DatabaseConnection>,
    watchers: Arc<Mutex<Watchers>>,
    publishing: Arc<tokio::sync::Mutex<()>>,
}

impl LocalCache {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db: Arc::new(db),
            watchers: Arc::new(Mutex::new(HashMap::new())),
            publishing: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// The underlying connection.
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Current star fields of a repository.
    pub async fn snapshot(&self, id: i64) -> Result<Option<StarSnapshot>> {
        repos::star_snapshot(&*self.db, id).await
    }

    /// Subscribe to the star fields of a repository.
    ///
    /// The receiver holds the current value immediately and sees every later
    /// change made through this cache. Existing subscribers are only woken if
    /// the value they hold was out of date.
    pub async fn subscribe(&self, id: i64) -> Result<watch::Receiver<Option<StarSnapshot>>> {
        let _guard = self.publishing.lock().await;
        let current = self.snapshot(id).await?;
        let mut watchers = self.watchers();
        watchers.retain(|_, tx| tx.receiver_count() > 0);
        match watchers.get(&id) {
            Some(tx) => {
                send_if_changed(tx, current);
                Ok(tx.subscribe())
            }
            None => {
                let (tx, rx) = watch::channel(current);
                watchers.insert(id, tx);
                Ok(rx)
            }
        }
    }

    /// Mark starred and set the count in one statement.
    pub async fn star_local(&self, id: i64, stargazers_count: i32) -> Result<()> {
        self.set_star(id, StarState::Starred, stargazers_count).await
    }

    /// Mark not starred and set the count in one statement.
    pub async fn unstar_local(&self, id: i64, stargazers_count: i32) -> Result<()> {
        self.set_star(id, StarState::NotStarred, stargazers_count)
            .await
    }

    pub(crate) async fn set_star(
        &self,
        id: i64,
        state: StarState,
        stargazers_count: i32,
    ) -> Result<()> {
        let _guard = self.publishing.lock().await;
        let updated = repos::set_star(&*self.db, id, state, stargazers_count).await?;
        if updated == 0 {
            return Err(CacheError::NotFound { id });
        }
        tracing::debug!(id, %state, stargazers_count, "Cached star state");
        self.publish_locked(id).await
    }

    /// Record a reconciled star state without touching the count.
    pub async fn set_star_state(&self, id: i64, state: StarState) -> Result<()> {
        let _guard = self.publishing.lock().await;
        let updated = repos::set_star_state(&*self.db, id, state).await?;
        if updated == 0 {
            return Err(CacheError::NotFound { id });
        }
        self.publish_locked(id).await
    }

    /// Overwrite the count with an authoritative value from the remote.
    pub async fn set_stargazers_count(&self, id: i64, stargazers_count: i32) -> Result<()> {
        let _guard = self.publishing.lock().await;
        let updated = repos::set_stargazers_count(&*self.db, id, stargazers_count).await?;
        if updated == 0 {
            return Err(CacheError::NotFound { id });
        }
        self.publish_locked(id).await
    }

    /// Re-read and publish the snapshot of one repository.
    pub async fn publish(&self, id: i64) -> Result<()> {
        let _guard = self.publishing.lock().await;
        self.publish_locked(id).await
    }

    /// Re-publish every watched repository, after bulk writes.
    pub async fn notify_all(&self) -> Result<()> {
        let _guard = self.publishing.lock().await;
        let ids: Vec<i64> = self.watchers().keys().copied().collect();
        for id in ids {
            self.publish_locked(id).await?;
        }
        Ok(())
    }

    /// Caller holds `publishing`.
    async fn publish_locked(&self, id: i64) -> Result<()> {
        if !self.watchers().contains_key(&id) {
            return Ok(());
        }
        let current = self.snapshot(id).await?;
        if let Some(tx) = self.watchers().get(&id) {
            send_if_changed(tx, current);
        }
        Ok(())
    }

    fn watchers(&self) -> MutexGuard<'_, Watchers> {
        self.watchers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn send_if_changed(tx: &watch::Sender<Option<StarSnapshot>>, current: Option<StarSnapshot>) {
    tx.send_if_modified(|held| {
        if *held == current {
            return false;
        }
        *held = current;
        true
    });
}
