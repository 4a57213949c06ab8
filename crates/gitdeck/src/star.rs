//! Optimistic star/unstar with reconciliation and backoff retries.
//!
//! [`StarSync`] applies the local change first, then talks to the remote
//! source on a background task. Transient failures are retried by the
//! session's [`BackoffWorkManager`](crate::work::BackoffWorkManager) under
//! the key `star_<id>`, and only the latest intent per repository is ever
//! retried.

mod engine;
mod error;

pub use engine::{StarAction, StarDispatch, StarOutcome, StarSync, retry_key};
pub use error::{Dismissal, Result, SyncError};
