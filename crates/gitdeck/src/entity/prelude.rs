//! Common re-exports for convenient entity usage.

pub use super::cache_meta::{
    ActiveModel as CacheMetaActiveModel, Column as CacheMetaColumn, Entity as CacheMeta,
    Model as CacheMetaModel,
};
pub use super::remote_key::{
    ActiveModel as RemoteKeyActiveModel, Column as RemoteKeyColumn, Entity as RemoteKey,
    Model as RemoteKeyModel,
};
pub use super::repository::{
    ActiveModel as RepositoryActiveModel, Column as RepositoryColumn, Entity as Repository,
    Model as RepositoryModel,
};
pub use super::star_state::StarState;
