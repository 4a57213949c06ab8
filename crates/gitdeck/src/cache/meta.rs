use sea_orm::{ConnectionTrait, EntityTrait, Set, sea_query::OnConflict};

use crate::entity::cache_meta::{ActiveModel, Column, Entity as CacheMeta};

use super::errors::Result;

const FEED_OWNER: &str = "feed_owner";

/// Login whose repository feed the cache holds, if any page was ever stored.
pub async fn feed_owner<C: ConnectionTrait>(db: &C) -> Result<Option<String>> {
    Ok(CacheMeta::find_by_id(FEED_OWNER)
        .one(db)
        .await?
        .map(|row| row.value))
}

/// Record `user` as the owner of the cached feed.
pub async fn set_feed_owner<C: ConnectionTrait>(db: &C, user: &str) -> Result<()> {
    let row = ActiveModel {
        key: Set(FEED_OWNER.to_string()),
        value: Set(user.to_string()),
    };
    CacheMeta::insert(row)
        .on_conflict(
            OnConflict::column(Column::Key)
                .update_column(Column::Value)
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// GitHub logins compare case-insensitively.
pub fn same_user(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
