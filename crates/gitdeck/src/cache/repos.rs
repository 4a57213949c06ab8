use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
    sea_query::{Expr, OnConflict},
};

use crate::entity::repository::{ActiveModel, Column, Entity as Repository, Model};
use crate::entity::star_state::StarState;

use super::errors::Result;
use super::store::StarSnapshot;

// ─── Reads ───────────────────────────────────────────────────────────────────

/// Find a cached repository by its remote ID.
pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Model>> {
    Ok(Repository::find_by_id(id).one(db).await?)
}

/// Find a cached repository by owner login and name.
pub async fn find_by_full_name<C: ConnectionTrait>(
    db: &C,
    owner: &str,
    name: &str,
) -> Result<Option<Model>> {
    Ok(Repository::find()
        .filter(Column::OwnerLogin.eq(owner))
        .filter(Column::Name.eq(name))
        .one(db)
        .await?)
}

/// The star fields of one cached repository.
pub async fn star_snapshot<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<StarSnapshot>> {
    Ok(find_by_id(db, id).await?.map(|m| StarSnapshot::from(&m)))
}

/// Read `limit` repositories starting at `offset`, in remote feed order.
pub async fn page<C: ConnectionTrait>(db: &C, offset: u64, limit: u64) -> Result<Vec<Model>> {
    Ok(Repository::find()
        .order_by_asc(Column::SortIndex)
        .order_by_asc(Column::Id)
        .offset(offset)
        .limit(limit)
        .all(db)
        .await?)
}

/// Number of cached repositories.
pub async fn count<C: ConnectionTrait>(db: &C) -> Result<u64> {
    Ok(Repository::find().count(db).await?)
}

/// IDs of the first and last repository in feed order, if any are cached.
pub async fn edge_ids<C: ConnectionTrait>(db: &C) -> Result<Option<(i64, i64)>> {
    let first = Repository::find()
        .order_by_asc(Column::SortIndex)
        .order_by_asc(Column::Id)
        .one(db)
        .await?;
    let last = Repository::find()
        .order_by_desc(Column::SortIndex)
        .order_by_desc(Column::Id)
        .one(db)
        .await?;
    Ok(first.zip(last).map(|(f, l)| (f.id, l.id)))
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Build the ON CONFLICT clause for page inserts.
///
/// A later page wins over whatever was cached under the same ID, star state
/// included.
pub(crate) fn build_upsert_on_conflict() -> OnConflict {
    OnConflict::column(Column::Id)
        .update_columns([
            Column::Name,
            Column::OwnerLogin,
            Column::OwnerAvatarUrl,
            Column::Description,
            Column::Language,
            Column::DefaultBranch,
            Column::UpdatedAt,
            Column::StargazersCount,
            Column::ForksCount,
            Column::IsStarred,
            Column::SortIndex,
        ])
        .to_owned()
}

/// Insert or overwrite repositories by ID in a single statement.
///
/// Returns the number of models written.
pub async fn upsert_many<C: ConnectionTrait>(db: &C, models: Vec<ActiveModel>) -> Result<u64> {
    if models.is_empty() {
        return Ok(0);
    }

    let count = models.len() as u64;
    Repository::insert_many(models)
        .on_conflict(build_upsert_on_conflict())
        .exec_without_returning(db)
        .await?;
    Ok(count)
}

/// Set the star state of one repository, leaving its count alone.
///
/// Returns the number of rows updated (0 when the ID is not cached).
pub async fn set_star_state<C: ConnectionTrait>(db: &C, id: i64, state: StarState) -> Result<u64> {
    let result = Repository::update_many()
        .col_expr(Column::IsStarred, Expr::value(state))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Set star state and stargazer count together in one UPDATE.
pub async fn set_star<C: ConnectionTrait>(
    db: &C,
    id: i64,
    state: StarState,
    stargazers_count: i32,
) -> Result<u64> {
    let result = Repository::update_many()
        .col_expr(Column::IsStarred, Expr::value(state))
        .col_expr(Column::StargazersCount, Expr::value(stargazers_count.max(0)))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Overwrite the stargazer count with an authoritative value.
pub async fn set_stargazers_count<C: ConnectionTrait>(
    db: &C,
    id: i64,
    stargazers_count: i32,
) -> Result<u64> {
    let result = Repository::update_many()
        .col_expr(Column::StargazersCount, Expr::value(stargazers_count.max(0)))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Delete every cached repository.
pub async fn clear<C: ConnectionTrait>(db: &C) -> Result<u64> {
    let result = Repository::delete_many().exec(db).await?;
    Ok(result.rows_affected)
}
