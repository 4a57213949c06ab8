//! Tri-state star flag for cached repositories.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether the authenticated user has starred a repository.
///
/// `Unknown` is the state of every row inserted by a page load. It is
/// replaced by `Starred` or `NotStarred` the first time the repository is
/// reconciled against the remote source, and only a full refresh brings it
/// back.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum StarState {
    #[default]
    #[sea_orm(string_value = "unknown")]
    Unknown,
    #[sea_orm(string_value = "starred")]
    Starred,
    #[sea_orm(string_value = "not_starred")]
    NotStarred,
}

impl StarState {
    /// Map a known boolean into a state.
    #[inline]
    pub fn from_starred(starred: bool) -> Self {
        if starred {
            Self::Starred
        } else {
            Self::NotStarred
        }
    }

    /// `Some(true)`/`Some(false)` once reconciled, `None` while unknown.
    #[inline]
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Unknown => None,
            Self::Starred => Some(true),
            Self::NotStarred => Some(false),
        }
    }

    #[inline]
    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for StarState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StarState::Unknown => write!(f, "unknown"),
            StarState::Starred => write!(f, "starred"),
            StarState::NotStarred => write!(f, "not starred"),
        }
    }
}
