//! RemoteKey entity - page cursor bookkeeping for each cached repository.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Page indices adjacent to the page a repository was loaded from.
///
/// `prev_key` is `None` for rows from page 1; `next_key` is `None` for rows
/// from the last page.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "remote_keys")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub repo_id: i64,
    pub prev_key: Option<i32>,
    pub next_key: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
