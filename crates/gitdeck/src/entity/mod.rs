//! SeaORM entity definitions for the local cache schema.

pub mod cache_meta;
pub mod prelude;
pub mod remote_key;
pub mod repository;
pub mod star_state;
