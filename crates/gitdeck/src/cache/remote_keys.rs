use sea_orm::{ConnectionTrait, EntityTrait, sea_query::OnConflict};

use crate::entity::remote_key::{ActiveModel, Column, Entity as RemoteKey, Model};

use super::errors::Result;

/// Cursor of one cached repository.
pub async fn find<C: ConnectionTrait>(db: &C, repo_id: i64) -> Result<Option<Model>> {
    Ok(RemoteKey::find_by_id(repo_id).one(db).await?)
}

/// Insert cursors, overwriting any already stored for the same repository.
pub async fn insert_many<C: ConnectionTrait>(db: &C, keys: Vec<ActiveModel>) -> Result<u64> {
    if keys.is_empty() {
        return Ok(0);
    }

    let count = keys.len() as u64;
    RemoteKey::insert_many(keys)
        .on_conflict(
            OnConflict::column(Column::RepoId)
                .update_columns([Column::PrevKey, Column::NextKey])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(count)
}

/// Delete every cursor.
pub async fn clear<C: ConnectionTrait>(db: &C) -> Result<u64> {
    let result = RemoteKey::delete_many().exec(db).await?;
    Ok(result.rows_affected)
}
