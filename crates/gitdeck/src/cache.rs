//! Local cache of repositories and page cursors.
//!
//! The free functions in [`repos`], [`remote_keys`] and [`meta`] work over any
//! `ConnectionTrait`, so they run equally on a connection or inside a
//! transaction. [`LocalCache`] wraps a connection and additionally publishes
//! star snapshots to subscribers.

mod errors;
pub mod meta;
pub mod remote_keys;
pub mod repos;
mod store;

pub use errors::{CacheError, Result};
pub use store::{LocalCache, StarSnapshot};
