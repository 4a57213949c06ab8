//! Merges the paged remote feed into the local cache.
//!
//! The cache is the single source for rendering; [`RepoMediator::load`] is
//! called when the view needs more data in either direction, or a full
//! refresh. Every page is persisted in one transaction together with the
//! prev/next cursors of its rows.

mod mediator;

pub use mediator::{
    DEFAULT_PAGE_SIZE, LoadOutcome, LoadType, MediatorError, PagingState, RepoMediator, Result,
};
