//! Database connection utilities.

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

const SQLITE_PRAGMAS: [&str; 3] = [
    "PRAGMA journal_mode=WAL",
    "PRAGMA busy_timeout=5000",
    "PRAGMA synchronous=NORMAL",
];

/// Configure SQLite pragmas for a file-backed cache.
///
/// - `journal_mode=WAL` so readers never block the writer
/// - `busy_timeout=5000` to wait for locks instead of failing immediately
/// - `synchronous=NORMAL`, which is safe under WAL
async fn configure_sqlite(db: &DatabaseConnection) -> Result<(), DbErr> {
    for pragma in SQLITE_PRAGMAS {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            pragma.to_string(),
        ))
        .await?;
    }
    Ok(())
}

fn is_file_backed_sqlite(database_url: &str) -> bool {
    database_url.starts_with("sqlite://")
}

/// Establish a connection to the cache database.
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    if is_file_backed_sqlite(database_url) {
        configure_sqlite(&db).await?;
    }

    Ok(db)
}

/// Establish a connection and run all pending migrations.
///
/// `sqlite::memory:` is accepted and gives every caller a fresh, empty cache,
/// which is what the tests use.
///
/// # Example
/// ```ignore
/// let db = gitdeck::connect_and_migrate("sqlite://gitdeck.db?mode=rwc").await?;
/// ```
#[cfg(feature = "migrate")]
pub async fn connect_and_migrate(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    use sea_orm_migration::MigratorTrait;

    let db = connect(database_url).await?;
    crate::migration::Migrator::up(&db, None).await?;
    Ok(db)
}
