//! Keyed, cancellable retry loops with exponential backoff.
//!
//! A [`BackoffWorkManager`] runs at most one task per key. Adding work for a
//! key that is already running cancels the running task and replaces it, so
//! only the latest intent for the key survives.
//!
//! # Example
//!
//! ```ignore
//! use gitdeck::work::{BackoffWorkManager, CallOutcome, RetryPolicy};
//!
//! let work = BackoffWorkManager::new();
//! work.add_work("star_42", RetryPolicy::default(), move || async move {
//!     CallOutcome::from(remote.star("octocat", "hello").await)
//! });
//! work.wait_idle().await;
//! ```

mod manager;
mod outcome;
mod policy;

pub use manager::BackoffWorkManager;
pub use outcome::CallOutcome;
pub use policy::{
    DEFAULT_FACTOR, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY_MS,
    RetryPolicy,
};
