use sea_orm::DbErr;
use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Database error from sea-orm.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// No cached row for the repository.
    #[error("Repository {id} is not cached")]
    NotFound { id: i64 },
}

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
