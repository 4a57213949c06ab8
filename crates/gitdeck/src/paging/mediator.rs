use std::sync::Arc;

use sea_orm::{ConnectionTrait, DbErr, Set, TransactionTrait};
use thiserror::Error;

use crate::cache::{CacheError, LocalCache, meta, remote_keys, repos};
use crate::entity::remote_key::{ActiveModel as RemoteKeyActiveModel, Model as RemoteKey};
use crate::remote::{RemoteError, RemoteSource, RepoSummary};

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 30;

/// Errors that can occur during a page load. The cache is left untouched.
#[derive(Debug, Error)]
pub enum MediatorError {
    #[error("Failed to fetch page: {0}")]
    Remote(#[from] RemoteError),

    #[error("Failed to store page: {0}")]
    Cache(#[from] CacheError),

    #[error("Failed to store page: {0}")]
    Database(#[from] DbErr),

    /// The cached pages were loaded for another user.
    #[error("Cached pages do not belong to {requested}; refresh first")]
    ForeignFeed { requested: String },
}

/// Result type for page loads.
pub type Result<T> = std::result::Result<T, MediatorError>;

/// Direction of a page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadType {
    /// Replace the cache with the page around the anchor.
    Refresh,
    /// Load the page before the first cached item.
    Prepend,
    /// Load the page after the last cached item.
    Append,
}

/// What the view currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingState {
    pub page_size: u32,
    /// Item closest to the current scroll position, used by refresh.
    pub anchor_id: Option<i64>,
    pub first_id: Option<i64>,
    pub last_id: Option<i64>,
}

impl PagingState {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            anchor_id: None,
            first_id: None,
            last_id: None,
        }
    }

    #[must_use]
    pub fn with_anchor(mut self, anchor_id: Option<i64>) -> Self {
        self.anchor_id = anchor_id;
        self
    }

    /// Take the first and last item from the cache.
    pub async fn from_cache<C: ConnectionTrait>(
        db: &C,
        page_size: u32,
        anchor_id: Option<i64>,
    ) -> Result<Self> {
        let edges = repos::edge_ids(db).await?;
        Ok(Self {
            page_size,
            anchor_id,
            first_id: edges.map(|(first, _)| first),
            last_id: edges.map(|(_, last)| last),
        })
    }
}

/// Result of a successful page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOutcome {
    /// No more pages in the requested direction.
    pub end_of_pagination_reached: bool,
    /// Rows written; zero when nothing was fetched.
    pub fetched: usize,
}

impl LoadOutcome {
    fn skipped(end_of_pagination_reached: bool) -> Self {
        Self {
            end_of_pagination_reached,
            fetched: 0,
        }
    }
}

/// Pages one user's repositories from `R` into the cache.
pub struct RepoMediator<R> {
    remote: Arc<R>,
    cache: LocalCache,
    user: String,
}

impl<R: RemoteSource> RepoMediator<R> {
    pub fn new(remote: Arc<R>, cache: LocalCache, user: impl Into<String>) -> Self {
        Self {
            remote,
            cache,
            user: user.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Whether the cache must be refreshed before paging: it is empty, or it
    /// holds another user's feed.
    pub async fn needs_refresh(&self) -> Result<bool> {
        let db = self.cache.db();
        if repos::count(db).await? == 0 {
            return Ok(true);
        }
        Ok(!self.owns_feed().await?)
    }

    /// An empty cache with no recorded owner counts as ours.
    async fn owns_feed(&self) -> Result<bool> {
        let db = self.cache.db();
        match meta::feed_owner(db).await? {
            Some(owner) => Ok(meta::same_user(&owner, &self.user)),
            None => Ok(repos::count(db).await? == 0),
        }
    }

    /// Load one page in the given direction.
    ///
    /// Loads are expected to be serialized by the caller. Prepend and append
    /// fail with [`MediatorError::ForeignFeed`] when the cache holds another
    /// user's feed.
    pub async fn load(&self, load_type: LoadType, state: &PagingState) -> Result<LoadOutcome> {
        if load_type != LoadType::Refresh && !self.owns_feed().await? {
            return Err(MediatorError::ForeignFeed {
                requested: self.user.clone(),
            });
        }

        let page = match load_type {
            LoadType::Refresh => self.refresh_page(state.anchor_id).await?,
            LoadType::Prepend => match self.cursor(state.first_id).await? {
                None => return Ok(LoadOutcome::skipped(false)),
                Some(RemoteKey { prev_key: None, .. }) => return Ok(LoadOutcome::skipped(true)),
                Some(RemoteKey {
                    prev_key: Some(prev),
                    ..
                }) => prev,
            },
            LoadType::Append => match self.cursor(state.last_id).await? {
                None => return Ok(LoadOutcome::skipped(false)),
                Some(RemoteKey { next_key: None, .. }) => return Ok(LoadOutcome::skipped(true)),
                Some(RemoteKey {
                    next_key: Some(next),
                    ..
                }) => next,
            },
        };

        let page = u32::try_from(page.max(1)).unwrap_or(1);
        let page_size = state.page_size.max(1);
        tracing::debug!(?load_type, page, page_size, user = %self.user, "Loading page");

        let fetched = self
            .remote
            .fetch_page(&self.user, page_size, page)
            .await?;
        let end_of_pagination_reached = fetched.len() < page_size as usize;

        self.persist(load_type, page, page_size, &fetched, end_of_pagination_reached)
            .await?;
        self.cache.notify_all().await?;

        tracing::debug!(
            ?load_type,
            page,
            fetched = fetched.len(),
            end_of_pagination_reached,
            "Page stored"
        );
        Ok(LoadOutcome {
            end_of_pagination_reached,
            fetched: fetched.len(),
        })
    }

    /// The page holding the anchor: its cursor's `next_key - 1`, else 1.
    async fn refresh_page(&self, anchor_id: Option<i64>) -> Result<i32> {
        Ok(self
            .cursor(anchor_id)
            .await?
            .and_then(|key| key.next_key)
            .map(|next| next - 1)
            .filter(|page| *page >= 1)
            .unwrap_or(1))
    }

    async fn cursor(&self, id: Option<i64>) -> Result<Option<RemoteKey>> {
        match id {
            Some(id) => Ok(remote_keys::find(self.cache.db(), id).await?),
            None => Ok(None),
        }
    }

    async fn persist(
        &self,
        load_type: LoadType,
        page: u32,
        page_size: u32,
        fetched: &[RepoSummary],
        end_of_pagination_reached: bool,
    ) -> Result<()> {
        let page_key = i32::try_from(page).unwrap_or(i32::MAX);
        let prev_key = (page > 1).then(|| page_key - 1);
        let next_key = (!end_of_pagination_reached).then(|| page_key.saturating_add(1));
        let base_index = i64::from(page - 1) * i64::from(page_size);

        let keys = fetched
            .iter()
            .map(|repo| RemoteKeyActiveModel {
                repo_id: Set(repo.id),
                prev_key: Set(prev_key),
                next_key: Set(next_key),
            })
            .collect();
        let rows = fetched
            .iter()
            .enumerate()
            .map(|(offset, repo)| repo.to_active_model(base_index + offset as i64))
            .collect();

        // Dropping the transaction on any error rolls it back.
        let txn = self.cache.db().begin().await?;
        if load_type == LoadType::Refresh {
            let keys_cleared = remote_keys::clear(&txn).await?;
            let rows_cleared = repos::clear(&txn).await?;
            tracing::debug!(keys_cleared, rows_cleared, "Cleared cache for refresh");
            meta::set_feed_owner(&txn, &self.user).await?;
        }
        remote_keys::insert_many(&txn, keys).await?;
        repos::upsert_many(&txn, rows).await?;
        txn.commit().await?;
        Ok(())
    }
}

#[cfg(all(test, feature = "migrate"))]
mod tests {
    use sea_orm::{EntityTrait, QueryOrder};

    use crate::connect_and_migrate;
    use crate::entity::remote_key::{Column as RemoteKeyColumn, Entity as RemoteKeys};
    use crate::entity::star_state::StarState;
    use crate::test_support::{Call, TestRemote, catalogue};

    use super::*;

    const PAGE: u32 = 10;

    async fn setup(total: i64) -> (RepoMediator<TestRemote>, TestRemote) {
        let db = connect_and_migrate("sqlite::memory:").await.unwrap();
        let remote = TestRemote::with_catalogue(catalogue(total));
        let mediator = RepoMediator::new(Arc::new(remote.clone()), LocalCache::new(db), "octocat");
        (mediator, remote)
    }

    async fn state(mediator: &RepoMediator<TestRemote>, anchor: Option<i64>) -> PagingState {
        PagingState::from_cache(mediator.cache.db(), PAGE, anchor)
            .await
            .unwrap()
    }

    async fn cursor(mediator: &RepoMediator<TestRemote>, id: i64) -> RemoteKey {
        remote_keys::find(mediator.cache.db(), id)
            .await
            .unwrap()
            .expect("cursor")
    }

    async fn cached_ids(mediator: &RepoMediator<TestRemote>) -> Vec<i64> {
        repos::page(mediator.cache.db(), 0, 1_000)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect()
    }

    #[tokio::test]
    async fn refresh_full_page_is_not_the_end() {
        let (mediator, _) = setup(25).await;

        let outcome = mediator
            .load(LoadType::Refresh, &PagingState::new(PAGE))
            .await
            .unwrap();

        assert!(!outcome.end_of_pagination_reached);
        assert_eq!(outcome.fetched, 10);
        let key = cursor(&mediator, 1).await;
        assert_eq!(key.prev_key, None);
        assert_eq!(key.next_key, Some(2));
        assert_eq!(repos::count(mediator.cache.db()).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn refresh_short_page_is_the_end() {
        let (mediator, _) = setup(5).await;

        let outcome = mediator
            .load(LoadType::Refresh, &PagingState::new(PAGE))
            .await
            .unwrap();

        assert!(outcome.end_of_pagination_reached);
        assert_eq!(cursor(&mediator, 5).await.next_key, None);
    }

    #[tokio::test]
    async fn append_walks_pages_until_the_end() {
        let (mediator, remote) = setup(25).await;
        mediator
            .load(LoadType::Refresh, &PagingState::new(PAGE))
            .await
            .unwrap();

        let second = mediator
            .load(LoadType::Append, &state(&mediator, None).await)
            .await
            .unwrap();
        assert!(!second.end_of_pagination_reached);
        let key = cursor(&mediator, 11).await;
        assert_eq!((key.prev_key, key.next_key), (Some(1), Some(3)));

        let third = mediator
            .load(LoadType::Append, &state(&mediator, None).await)
            .await
            .unwrap();
        assert!(third.end_of_pagination_reached);
        assert_eq!(third.fetched, 5);

        // The last cursor has no next key: end without another fetch.
        let past_end = mediator
            .load(LoadType::Append, &state(&mediator, None).await)
            .await
            .unwrap();
        assert!(past_end.end_of_pagination_reached);
        assert_eq!(past_end.fetched, 0);

        assert_eq!(
            remote.calls(),
            [Call::FetchPage(1), Call::FetchPage(2), Call::FetchPage(3)]
        );
        assert_eq!(cached_ids(&mediator).await, (1..=25).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn rows_keep_remote_order() {
        let (mediator, _) = setup(15).await;
        mediator
            .load(LoadType::Refresh, &PagingState::new(PAGE))
            .await
            .unwrap();
        mediator
            .load(LoadType::Append, &state(&mediator, None).await)
            .await
            .unwrap();

        let row = repos::find_by_id(mediator.cache.db(), 12)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.sort_index, 11);
    }

    #[tokio::test]
    async fn prepend_at_first_page_is_the_end() {
        let (mediator, remote) = setup(25).await;
        mediator
            .load(LoadType::Refresh, &PagingState::new(PAGE))
            .await
            .unwrap();

        let outcome = mediator
            .load(LoadType::Prepend, &state(&mediator, None).await)
            .await
            .unwrap();

        assert!(outcome.end_of_pagination_reached);
        assert_eq!(remote.calls().len(), 1);
    }

    #[tokio::test]
    async fn missing_cursor_is_success_without_end() {
        let (mediator, remote) = setup(25).await;

        for load_type in [LoadType::Prepend, LoadType::Append] {
            let outcome = mediator
                .load(load_type, &state(&mediator, None).await)
                .await
                .unwrap();
            assert!(!outcome.end_of_pagination_reached);
            assert_eq!(outcome.fetched, 0);
        }
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn prepend_loads_the_previous_page_without_clearing() {
        let (mediator, remote) = setup(25).await;
        mediator
            .load(LoadType::Refresh, &PagingState::new(PAGE))
            .await
            .unwrap();
        mediator
            .load(LoadType::Append, &state(&mediator, None).await)
            .await
            .unwrap();

        // Refresh around item 15 reloads page 2 only.
        let anchored = state(&mediator, None).await.with_anchor(Some(15));
        mediator.load(LoadType::Refresh, &anchored).await.unwrap();
        assert_eq!(cached_ids(&mediator).await, (11..=20).collect::<Vec<_>>());

        let outcome = mediator
            .load(LoadType::Prepend, &state(&mediator, None).await)
            .await
            .unwrap();
        assert!(!outcome.end_of_pagination_reached);
        assert_eq!(cached_ids(&mediator).await, (1..=20).collect::<Vec<_>>());
        assert_eq!(remote.calls().last(), Some(&Call::FetchPage(1)));
    }

    #[tokio::test]
    async fn refresh_resets_star_state() {
        let (mediator, _) = setup(10).await;
        mediator
            .load(LoadType::Refresh, &PagingState::new(PAGE))
            .await
            .unwrap();
        mediator.cache.star_local(3, 11).await.unwrap();

        mediator
            .load(LoadType::Refresh, &PagingState::new(PAGE))
            .await
            .unwrap();

        let row = repos::find_by_id(mediator.cache.db(), 3)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.is_starred, StarState::Unknown);
        assert_eq!(row.stargazers_count, 10);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_cache_unchanged() {
        let (mediator, remote) = setup(25).await;
        mediator
            .load(LoadType::Refresh, &PagingState::new(PAGE))
            .await
            .unwrap();
        mediator.cache.star_local(1, 11).await.unwrap();
        let before = repos::page(mediator.cache.db(), 0, 100).await.unwrap();

        remote.fail_pages(Some(RemoteError::network("offline")));
        for load_type in [LoadType::Refresh, LoadType::Append] {
            let err = mediator
                .load(load_type, &state(&mediator, None).await)
                .await
                .unwrap_err();
            assert!(matches!(err, MediatorError::Remote(_)), "{err:?}");
        }

        let after = repos::page(mediator.cache.db(), 0, 100).await.unwrap();
        assert_eq!(before, after);
        assert_eq!(cursor(&mediator, 1).await.next_key, Some(2));
    }

    async fn all_cursors(mediator: &RepoMediator<TestRemote>) -> Vec<RemoteKey> {
        RemoteKeys::find()
            .order_by_asc(RemoteKeyColumn::RepoId)
            .all(mediator.cache.db())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn failed_write_rolls_back_the_whole_load() {
        let (mediator, _) = setup(25).await;
        mediator
            .load(LoadType::Refresh, &PagingState::new(PAGE))
            .await
            .unwrap();
        mediator
            .load(LoadType::Append, &state(&mediator, None).await)
            .await
            .unwrap();
        mediator.cache.star_local(1, 11).await.unwrap();
        let rows_before = repos::page(mediator.cache.db(), 0, 100).await.unwrap();
        let cursors_before = all_cursors(&mediator).await;

        // Every repository insert now fails, after the refresh has already
        // cleared both tables and written its cursors.
        mediator
            .cache
            .db()
            .execute_unprepared(
                "CREATE TRIGGER reject_rows BEFORE INSERT ON repositories \
                 BEGIN SELECT RAISE(ABORT, 'disk quota exceeded'); END",
            )
            .await
            .unwrap();

        for load_type in [LoadType::Refresh, LoadType::Append] {
            let err = mediator
                .load(load_type, &state(&mediator, None).await)
                .await
                .unwrap_err();
            assert!(matches!(err, MediatorError::Cache(_)), "{err:?}");
        }

        let other = RepoMediator::new(
            Arc::clone(&mediator.remote),
            mediator.cache.clone(),
            "hubot",
        );
        other
            .load(LoadType::Refresh, &PagingState::new(PAGE))
            .await
            .unwrap_err();

        assert_eq!(repos::page(mediator.cache.db(), 0, 100).await.unwrap(), rows_before);
        assert_eq!(all_cursors(&mediator).await, cursors_before);
        assert_eq!(
            meta::feed_owner(mediator.cache.db()).await.unwrap().as_deref(),
            Some("octocat")
        );
    }

    #[tokio::test]
    async fn another_users_feed_requires_a_refresh() {
        let (mediator, remote) = setup(25).await;
        assert!(mediator.needs_refresh().await.unwrap());
        mediator
            .load(LoadType::Refresh, &PagingState::new(PAGE))
            .await
            .unwrap();
        assert!(!mediator.needs_refresh().await.unwrap());

        let hubot = RepoMediator::new(Arc::new(remote.clone()), mediator.cache.clone(), "hubot");
        assert!(hubot.needs_refresh().await.unwrap());
        for load_type in [LoadType::Append, LoadType::Prepend] {
            let err = hubot
                .load(load_type, &state(&mediator, None).await)
                .await
                .unwrap_err();
            assert!(matches!(err, MediatorError::ForeignFeed { .. }), "{err:?}");
        }
        assert_eq!(remote.calls(), [Call::FetchPage(1)]);

        hubot
            .load(LoadType::Refresh, &PagingState::new(PAGE))
            .await
            .unwrap();
        assert!(!hubot.needs_refresh().await.unwrap());
        assert!(mediator.needs_refresh().await.unwrap());

        // Logins are case-insensitive.
        let shouting = RepoMediator::new(Arc::new(remote.clone()), mediator.cache.clone(), "HUBOT");
        assert!(!shouting.needs_refresh().await.unwrap());
    }
}
