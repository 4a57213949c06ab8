//! Repository entity - one cached row per remote repository.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::star_state::StarState;

/// Cached repository, as listed by the paged feed.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repositories")]
pub struct Model {
    /// Remote-assigned repository ID.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    // ─── Naming ──────────────────────────────────────────────────────────────
    pub name: String,
    /// Owner login (user or organization).
    pub owner_login: String,
    #[sea_orm(column_type = "Text")]
    pub owner_avatar_url: String,

    // ─── Content ─────────────────────────────────────────────────────────────
    #[sea_orm(column_type = "Text")]
    pub description: Option<String>,
    pub language: Option<String>,
    #[sea_orm(default_value = "main")]
    pub default_branch: String,
    /// Last update as reported by the remote; display only.
    pub updated_at: String,

    // ─── Stars ───────────────────────────────────────────────────────────────
    pub stargazers_count: i32,
    pub forks_count: i32,
    pub is_starred: StarState,

    /// Position in the remote feed: `(page - 1) * page_size + offset`.
    pub sort_index: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Compute the full name (owner/name).
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner_login, self.name)
    }
}
